//! Shared test doubles and harness for integration tests.
//!
//! [`FakeProber`] and [`FakeThumbnailer`] stand in for ffprobe and ffmpeg so
//! sync passes run without external tools. [`Harness`] wires them into a
//! [`SyncEngine`] over an in-memory catalog.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use vidsync::sync::{SyncEngine, SyncSettings};
use vidsync_av::{thumbnail_file_name, Error, MetadataProber, ProbeInfo, ThumbnailGenerator};
use vidsync_common::paths::ExtensionFilter;
use vidsync_common::IdentityStrategy;
use vidsync_db::{CatalogStore, MediaRoot, MemoryCatalog, NewMediaRoot};

/// Prober returning fixed metadata, failing for selected file names.
#[derive(Default)]
pub struct FakeProber {
    calls: AtomicUsize,
    per_path: Mutex<HashMap<PathBuf, usize>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeProber {
    pub fn fail_on(&self, file_name: &str) {
        self.failing.lock().insert(file_name.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().clear();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, path: &Path) -> usize {
        self.per_path.lock().get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl MetadataProber for FakeProber {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, path: &Path) -> vidsync_av::Result<ProbeInfo> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.per_path.lock().entry(path.to_path_buf()).or_default() += 1;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing.lock().contains(&name) {
            return Err(Error::tool_failed("ffprobe", "Invalid data found when processing input"));
        }

        Ok(ProbeInfo {
            duration_secs: 42.0,
            format: "matroska,webm".to_string(),
            codec: "h264".to_string(),
            width: Some(1280),
            height: Some(720),
        })
    }
}

/// Thumbnailer that writes a small file, memoized like the real one.
#[derive(Default)]
pub struct FakeThumbnailer {
    invocations: AtomicUsize,
    failing: AtomicBool,
}

impl FakeThumbnailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Times a thumbnail was actually generated.
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThumbnailGenerator for FakeThumbnailer {
    async fn ensure_thumbnail(
        &self,
        source: &Path,
        output_dir: &Path,
        _duration_secs: f64,
    ) -> vidsync_av::Result<PathBuf> {
        let target = output_dir.join(thumbnail_file_name(source));
        if target.exists() {
            return Ok(target);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::tool_failed("ffmpeg", "Output file is empty"));
        }
        std::fs::create_dir_all(output_dir)?;
        std::fs::write(&target, b"\xff\xd8\xff\xe0fake-jpeg")?;
        self.invocations.fetch_add(1, Ordering::SeqCst);
        Ok(target)
    }
}

pub struct Harness {
    pub store: Arc<dyn CatalogStore>,
    pub prober: Arc<FakeProber>,
    pub thumbnailer: Arc<FakeThumbnailer>,
    pub engine: SyncEngine,
    /// Holds media roots and the thumbnail directory.
    pub dir: TempDir,
}

impl Harness {
    pub fn new(identity: IdentityStrategy) -> Self {
        Self::with_store(Arc::new(MemoryCatalog::new()), identity, false)
    }

    pub fn with_store(store: Arc<dyn CatalogStore>, identity: IdentityStrategy, reclaim_unreachable: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let prober = Arc::new(FakeProber::default());
        let thumbnailer = Arc::new(FakeThumbnailer::default());
        let settings = settings(dir.path(), identity, reclaim_unreachable);
        let engine = SyncEngine::new(store.clone(), prober.clone(), thumbnailer.clone(), settings);

        Self {
            store,
            prober,
            thumbnailer,
            engine,
            dir,
        }
    }

    /// An engine over the same store and doubles with different settings.
    pub fn engine_with(&self, identity: IdentityStrategy, reclaim_unreachable: bool) -> SyncEngine {
        SyncEngine::new(
            self.store.clone(),
            self.prober.clone(),
            self.thumbnailer.clone(),
            settings(self.dir.path(), identity, reclaim_unreachable),
        )
    }

    pub fn thumbnail_dir(&self) -> PathBuf {
        self.dir.path().join("thumbs")
    }

    /// Create `name` under the harness directory and register it as a root.
    pub fn root(&self, name: &str, recursive: bool) -> MediaRoot {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path).unwrap();
        self.store
            .register_root(NewMediaRoot {
                name: name.to_string(),
                path,
                recursive,
            })
            .unwrap()
    }

    pub fn file_names(&self, root: &MediaRoot) -> Vec<String> {
        self.store
            .list_by_root(root.id)
            .unwrap()
            .into_iter()
            .map(|e| e.file_name)
            .collect()
    }
}

fn settings(dir: &Path, identity: IdentityStrategy, reclaim_unreachable: bool) -> SyncSettings {
    SyncSettings {
        extensions: ExtensionFilter::default(),
        thumbnail_dir: dir.join("thumbs"),
        identity,
        workers: 4,
        reclaim_unreachable_roots: reclaim_unreachable,
    }
}

pub fn write(root: &MediaRoot, name: &str, contents: &[u8]) -> PathBuf {
    let path = root.path.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
    path
}
