mod cli;

use vidsync::{bootstrap, config, server, sync};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use vidsync_av::MetadataProber;

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting vidsync server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let store = bootstrap::open_catalog(&config.catalog)?;
    let engine = bootstrap::build_engine(&config, store)?;

    let shutdown = CancellationToken::new();
    let scheduler = sync::spawn_periodic(
        engine.clone(),
        config.sync.interval(),
        config.sync.run_on_start,
        shutdown.clone(),
    );

    let ctx = server::AppContext::new(config, engine);
    let server_result = server::start_server(ctx, shutdown.clone()).await;

    tracing::info!("Shutting down...");
    shutdown.cancel();
    if let Err(e) = scheduler.await {
        tracing::warn!("Scheduler task ended abnormally: {}", e);
    }

    server_result
}

async fn run_sync(config_path: Option<&Path>, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let store = bootstrap::open_catalog(&config.catalog)?;
    let engine = bootstrap::build_engine(&config, store)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after in-flight files");
            on_signal.cancel();
        }
    });

    let roots = engine.store().list_roots()?;
    let report = engine.synchronize_with_cancel(&roots, &cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for root in &report.roots {
        println!("{} [{:?}]", root.root_path.display(), root.status);
        println!(
            "  created {}, updated {}, unchanged {}, deleted {}",
            root.created, root.updated, root.unchanged, root.deleted
        );
        println!(
            "  failed {}, skipped {}, duplicates {}, thumbnail failures {}",
            root.failed, root.skipped, root.duplicates, root.thumbnail_failures
        );
        println!("  took {} ms", root.duration_ms);
    }
    if report.roots.is_empty() {
        println!("No media roots configured.");
    }

    Ok(())
}

async fn probe_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let prober = bootstrap::prober(&config.tools);
    let info = prober.probe(file).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("File: {}", file.display());
        println!("Format: {}", info.format);
        let secs = info.duration_secs as u64;
        println!(
            "Duration: {:02}:{:02}:{:02}",
            secs / 3600,
            (secs / 60) % 60,
            secs % 60
        );
        if info.codec.is_empty() {
            println!("Video: none");
        } else {
            match (info.width, info.height) {
                (Some(w), Some(h)) => println!("Video: {} {}x{}", info.codec, w, h),
                _ => println!("Video: {}", info.codec),
            }
        }
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = vidsync_av::check_tools(
        config.tools.ffmpeg_path.as_deref(),
        config.tools.ffprobe_path.as_deref(),
    );
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Files will be cataloged without metadata or thumbnails until they are installed.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Catalog: {:?} ({:?})", config.catalog.backend, config.catalog.path);
            println!("  Identity: {}", config.sync.identity);
            println!("  Workers: {}", config.sync.workers);
            println!("  Extensions: {}", config.sync.extensions.join(", "));
            println!("  Roots: {}", config.roots.len());
            for root in &config.roots {
                println!(
                    "    {} -> {:?}{}",
                    root.name,
                    root.path,
                    if root.recursive { "" } else { " (flat)" }
                );
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Catalog: {:?}", config.catalog.path);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidsync=trace,vidsync_av=trace,vidsync_db=debug,vidsync_common=debug,tower_http=debug".to_string()
        } else {
            "vidsync=info,vidsync_av=info,vidsync_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Sync { json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_sync(cli.config.as_deref(), json))
        }
        Commands::Probe { file, json } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(probe_file(&file, cli.config.as_deref(), json))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidsync {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
