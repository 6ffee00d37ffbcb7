mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    parse_config(&content).with_context(|| format!("Invalid config file: {:?}", path))
}

/// Parse and validate configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config")?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./vidsync.toml",
        "./config.toml",
        "~/.config/vidsync/config.toml",
        "/etc/vidsync/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if config.sync.workers == 0 {
        anyhow::bail!("sync.workers must be at least 1");
    }

    if vidsync_common::paths::ExtensionFilter::new(&config.sync.extensions).is_empty() {
        anyhow::bail!("sync.extensions must list at least one extension");
    }

    if !config.thumbnail.offset_secs.is_finite() || config.thumbnail.offset_secs < 0.0 {
        anyhow::bail!(
            "thumbnail.offset_secs must be a non-negative number, got {}",
            config.thumbnail.offset_secs
        );
    }

    let mut seen = HashSet::new();
    for root in &config.roots {
        if root.name.trim().is_empty() {
            anyhow::bail!("Root {:?} has an empty name", root.path);
        }
        if !seen.insert(&root.path) {
            anyhow::bail!("Root path {:?} is configured more than once", root.path);
        }
        if !root.path.exists() {
            tracing::warn!("Root path does not exist: {:?}", root.path);
        }
    }

    Ok(())
}
