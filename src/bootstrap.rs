//! Wiring of the catalog, the media tools and the sync engine from config.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use vidsync_av::{FfmpegThumbnailer, FfprobeProber, MetadataProber, ThumbnailGenerator};
use vidsync_db::{CatalogStore, MemoryCatalog, NewMediaRoot, SqliteCatalog};

use crate::config::{CatalogBackend, CatalogConfig, Config, ToolsConfig};
use crate::sync::{SyncEngine, SyncSettings};

/// Open the configured catalog backend.
pub fn open_catalog(config: &CatalogConfig) -> Result<Arc<dyn CatalogStore>> {
    match config.backend {
        CatalogBackend::Memory => {
            tracing::info!("Using in-memory catalog");
            Ok(Arc::new(MemoryCatalog::new()))
        }
        CatalogBackend::Sqlite => {
            let path = shellexpand::tilde(&config.path.to_string_lossy()).into_owned();
            tracing::info!("Opening catalog at {}", path);
            let catalog = SqliteCatalog::open(Path::new(&path))
                .with_context(|| format!("Failed to open catalog at {}", path))?;
            Ok(Arc::new(catalog))
        }
    }
}

/// The ffprobe-backed prober.
///
/// A missing binary only produces a warning here; every probe then fails
/// softly with `ToolNotFound`.
pub fn prober(tools: &ToolsConfig) -> Arc<dyn MetadataProber> {
    let prober = FfprobeProber::locate(tools.ffprobe_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ffprobe not found, files cannot be probed");
        FfprobeProber::new(
            tools
                .ffprobe_path
                .clone()
                .unwrap_or_else(|| "ffprobe".into()),
        )
    });
    Arc::new(prober.with_timeout(tools.timeout()))
}

/// The ffmpeg-backed thumbnail generator.
pub fn thumbnailer(config: &Config) -> Arc<dyn ThumbnailGenerator> {
    let tools = &config.tools;
    let thumbnailer = FfmpegThumbnailer::locate(tools.ffmpeg_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ffmpeg not found, thumbnails cannot be generated");
        FfmpegThumbnailer::new(tools.ffmpeg_path.clone().unwrap_or_else(|| "ffmpeg".into()))
    });
    Arc::new(
        thumbnailer
            .with_offset(config.thumbnail.offset_strategy())
            .with_timeout(tools.timeout()),
    )
}

/// Register every configured root and build the engine.
pub fn build_engine(config: &Config, store: Arc<dyn CatalogStore>) -> Result<SyncEngine> {
    for root in &config.roots {
        let registered = store
            .register_root(NewMediaRoot::from(root))
            .with_context(|| format!("Failed to register root {:?}", root.path))?;
        tracing::debug!(root_id = %registered.id, root = %registered.path.display(), "Root registered");
    }

    Ok(SyncEngine::new(
        store,
        prober(&config.tools),
        thumbnailer(config),
        SyncSettings::from_config(&config.sync),
    ))
}
