use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use vidsync_av::OffsetStrategy;
use vidsync_common::paths::default_video_extensions;
use vidsync_common::IdentityStrategy;
use vidsync_db::NewMediaRoot;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub thumbnail: ThumbnailConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub roots: Vec<RootConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where the catalog lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub backend: CatalogBackend,

    /// SQLite database file, used by the sqlite backend.
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("vidsync.db")
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            backend: CatalogBackend::default(),
            path: default_catalog_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// File extensions treated as media
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: PathBuf,

    /// How files are matched to catalog entries across passes
    #[serde(default)]
    pub identity: IdentityStrategy,

    /// Concurrent files per root
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Seconds between periodic passes (0 = only on demand)
    #[serde(default)]
    pub interval_secs: u64,

    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,

    /// Reclaim every entry of a root whose directory cannot be listed
    #[serde(default)]
    pub reclaim_unreachable_roots: bool,
}

fn default_extensions() -> Vec<String> {
    default_video_extensions()
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_thumbnail_dir() -> PathBuf {
    PathBuf::from("thumbnails")
}
fn default_workers() -> usize {
    4
}
fn default_run_on_start() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            thumbnail_dir: default_thumbnail_dir(),
            identity: IdentityStrategy::default(),
            workers: default_workers(),
            interval_secs: 0,
            run_on_start: default_run_on_start(),
            reclaim_unreachable_roots: false,
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThumbnailConfig {
    /// Seek offset into the video, in seconds
    #[serde(default = "default_offset_secs")]
    pub offset_secs: f64,

    /// When set, offsets are pseudo-random but reproducible from this seed
    #[serde(default)]
    pub random_seed: Option<u64>,

    #[serde(default = "default_random_max_secs")]
    pub random_max_secs: u64,
}

fn default_offset_secs() -> f64 {
    1.0
}
fn default_random_max_secs() -> u64 {
    180
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            offset_secs: default_offset_secs(),
            random_seed: None,
            random_max_secs: default_random_max_secs(),
        }
    }
}

impl ThumbnailConfig {
    pub fn offset_strategy(&self) -> OffsetStrategy {
        match self.random_seed {
            Some(seed) => OffsetStrategy::SeededRandom {
                seed,
                max: Duration::from_secs(self.random_max_secs),
            },
            None => OffsetStrategy::Fixed(Duration::from_secs_f64(self.offset_secs.max(0.0))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Per-invocation limit for ffmpeg and ffprobe
    #[serde(default = "default_tool_timeout")]
    pub timeout_secs: u64,
}

fn default_tool_timeout() -> u64 {
    120
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            timeout_secs: default_tool_timeout(),
        }
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RootConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_recursive() -> bool {
    true
}

impl From<&RootConfig> for NewMediaRoot {
    fn from(root: &RootConfig) -> Self {
        NewMediaRoot {
            name: root.name.clone(),
            path: root.path.clone(),
            recursive: root.recursive,
        }
    }
}
