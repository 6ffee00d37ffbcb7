//! The sync engine.
//!
//! [`SyncEngine::sync_root`] runs one pass over one root:
//!
//! 1. take the root's lock
//! 2. walk the root
//! 3. phase 1: fingerprint every candidate on the blocking pool
//! 4. collapse duplicate fingerprints within the root (fingerprint identity only)
//! 5. phase 2: probe, thumbnail and upsert new or changed files
//! 6. reclaim entries whose files are gone, once every worker finished
//! 7. stamp the root's `last_scanned`
//!
//! Per-file problems never abort the pass; they end up in the
//! [`RootReport`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use vidsync_av::{MetadataProber, ThumbnailGenerator};
use vidsync_common::paths::ExtensionFilter;
use vidsync_common::{IdentityStrategy, Result};
use vidsync_db::{CatalogEntry, CatalogStore, EntryFields, IdentityKey, MediaRoot};

use super::hasher::fingerprint;
use super::locks::RootLocks;
use super::report::{RootReport, RootStatus, SyncReport};
use super::walker::{relative_name, walk};
use crate::config::SyncConfig;

/// Knobs of a sync pass.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub extensions: ExtensionFilter,
    pub thumbnail_dir: PathBuf,
    pub identity: IdentityStrategy,
    /// Files processed concurrently per root.
    pub workers: usize,
    /// Treat an unlistable root as empty and reclaim all of its entries.
    pub reclaim_unreachable_roots: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl SyncSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            extensions: ExtensionFilter::new(&config.extensions),
            thumbnail_dir: config.thumbnail_dir.clone(),
            identity: config.identity,
            workers: config.workers.max(1),
            reclaim_unreachable_roots: config.reclaim_unreachable_roots,
        }
    }
}

struct Inner {
    store: Arc<dyn CatalogStore>,
    prober: Arc<dyn MetadataProber>,
    thumbnailer: Arc<dyn ThumbnailGenerator>,
    settings: SyncSettings,
    locks: RootLocks,
}

/// Reconciles media roots on disk with the catalog.
///
/// Cloning is cheap; clones share the store, the tools and the root locks.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

/// A file that was fingerprinted in phase 1.
#[derive(Debug, Clone)]
struct Candidate {
    /// Canonical absolute path.
    path: PathBuf,
    file_name: String,
    fingerprint: String,
    size_bytes: u64,
    file_created: Option<DateTime<Utc>>,
}

enum HashOutcome {
    Ready(Candidate),
    /// Gone between listing and hashing.
    Vanished,
    /// Present but unreadable.
    Unreadable { path: PathBuf, file_name: String },
    Cancelled,
}

#[derive(Debug, PartialEq, Eq)]
enum FileOutcome {
    Created,
    Updated,
    Unchanged,
    Failed,
    Cancelled,
}

struct Processed {
    outcome: FileOutcome,
    thumbnail_failed: bool,
}

impl Processed {
    fn new(outcome: FileOutcome) -> Self {
        Self {
            outcome,
            thumbnail_failed: false,
        }
    }
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        prober: Arc<dyn MetadataProber>,
        thumbnailer: Arc<dyn ThumbnailGenerator>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                prober,
                thumbnailer,
                settings,
                locks: RootLocks::new(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.inner.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.inner.settings
    }

    /// Whether a pass over `root` is running right now.
    pub fn is_syncing(&self, root: &MediaRoot) -> bool {
        self.inner.locks.is_busy(root.id)
    }

    /// Synchronize every root registered in the store.
    pub async fn synchronize_all(&self) -> Result<SyncReport> {
        let roots = self.inner.store.list_roots()?;
        Ok(self.synchronize(&roots).await)
    }

    /// Synchronize `roots` in parallel.
    pub async fn synchronize(&self, roots: &[MediaRoot]) -> SyncReport {
        self.synchronize_with_cancel(roots, &CancellationToken::new())
            .await
    }

    pub async fn synchronize_with_cancel(
        &self,
        roots: &[MediaRoot],
        cancel: &CancellationToken,
    ) -> SyncReport {
        let passes = roots.iter().map(|root| self.sync_root(root, cancel));
        SyncReport {
            roots: futures::future::join_all(passes).await,
        }
    }

    /// Run one pass over `root`.
    pub async fn sync_root(&self, root: &MediaRoot, cancel: &CancellationToken) -> RootReport {
        let _guard = self.inner.locks.acquire(root.id).await;
        let started = Instant::now();

        tracing::info!(root_id = %root.id, root = %root.path.display(), "Starting sync pass");

        let mut report = RootReport::new(root.id, root.path.clone());
        self.run_pass(root, cancel, &mut report).await;
        report.duration_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            root_id = %root.id,
            status = ?report.status,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            deleted = report.deleted,
            failed = report.failed,
            skipped = report.skipped,
            duplicates = report.duplicates,
            thumbnail_failures = report.thumbnail_failures,
            duration_ms = report.duration_ms,
            "Sync pass finished"
        );
        report
    }

    async fn run_pass(&self, root: &MediaRoot, cancel: &CancellationToken, report: &mut RootReport) {
        let settings = &self.inner.settings;

        let listing = {
            let path = root.path.clone();
            let recursive = root.recursive;
            let filter = settings.extensions.clone();
            tokio::task::spawn_blocking(move || walk(&path, recursive, &filter)).await
        };
        let files = match listing {
            Ok(Ok(files)) => files,
            Ok(Err(e)) if settings.reclaim_unreachable_roots => {
                tracing::warn!(
                    root_id = %root.id,
                    root = %root.path.display(),
                    error = %e,
                    "Root is unavailable, reclaiming all of its entries"
                );
                Vec::new()
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    root_id = %root.id,
                    root = %root.path.display(),
                    error = %e,
                    "Root is unavailable, skipping reclamation"
                );
                report.status = RootStatus::RootUnavailable;
                return;
            }
            Err(e) => {
                tracing::error!(root_id = %root.id, error = %e, "Directory walk task failed");
                report.status = RootStatus::Failed;
                return;
            }
        };

        tracing::debug!(root_id = %root.id, candidates = files.len(), "Listed media root");

        let semaphore = Arc::new(Semaphore::new(settings.workers));

        // Keys seen on disk this pass, and paths that exist but could not be
        // processed. Entries matching either survive reclamation.
        let mut observed: HashSet<IdentityKey> = HashSet::new();
        let mut protected: HashSet<PathBuf> = HashSet::new();

        // Phase 1
        let mut candidates = Vec::with_capacity(files.len());
        for outcome in self.hash_all(root, files, &semaphore, cancel).await {
            match outcome {
                HashOutcome::Ready(candidate) => candidates.push(candidate),
                HashOutcome::Vanished => report.skipped += 1,
                HashOutcome::Unreadable { path, file_name } => {
                    report.failed += 1;
                    if settings.identity == IdentityStrategy::Path {
                        observed.insert(IdentityKey::Path {
                            root_id: Some(root.id),
                            file_name,
                        });
                    }
                    protected.insert(path);
                }
                HashOutcome::Cancelled => {}
            }
        }
        if cancel.is_cancelled() {
            report.status = RootStatus::Cancelled;
            return;
        }

        if settings.identity == IdentityStrategy::Fingerprint {
            let before = candidates.len();
            candidates = collapse_duplicates(candidates);
            report.duplicates = before - candidates.len();
        }

        for candidate in &candidates {
            observed.insert(self.key_for(root, candidate));
        }

        // Phase 2
        let mut handles = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let engine = self.clone();
            let root = root.clone();
            let sem = semaphore.clone();
            let cancel = cancel.clone();
            handles.push((
                candidate.path.clone(),
                tokio::spawn(async move {
                    let Ok(_permit) = sem.acquire_owned().await else {
                        return Processed::new(FileOutcome::Cancelled);
                    };
                    if cancel.is_cancelled() {
                        return Processed::new(FileOutcome::Cancelled);
                    }
                    engine.process(&root, candidate).await
                }),
            ));
        }

        for (path, handle) in handles {
            let processed = match handle.await {
                Ok(processed) => processed,
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "File task panicked");
                    Processed::new(FileOutcome::Failed)
                }
            };
            if processed.thumbnail_failed {
                report.thumbnail_failures += 1;
            }
            match processed.outcome {
                FileOutcome::Created => report.created += 1,
                FileOutcome::Updated => report.updated += 1,
                FileOutcome::Unchanged => report.unchanged += 1,
                FileOutcome::Failed => {
                    report.failed += 1;
                    protected.insert(path);
                }
                FileOutcome::Cancelled => {}
            }
        }
        if cancel.is_cancelled() {
            report.status = RootStatus::Cancelled;
            return;
        }

        match self.reclaim(root, &observed, &protected) {
            Ok((deleted, failed)) => {
                report.deleted = deleted;
                report.failed += failed;
            }
            Err(e) => {
                tracing::error!(root_id = %root.id, error = %e, "Failed to list entries for reclamation");
                report.status = RootStatus::Failed;
                return;
            }
        }

        if let Err(e) = self.inner.store.mark_root_scanned(root.id, Utc::now()) {
            tracing::error!(root_id = %root.id, error = %e, "Failed to record scan time");
            report.status = RootStatus::Failed;
        }
    }

    fn key_for(&self, root: &MediaRoot, candidate: &Candidate) -> IdentityKey {
        IdentityKey::new(
            self.inner.settings.identity,
            Some(root.id),
            &candidate.file_name,
            &candidate.fingerprint,
        )
    }

    /// Phase 1: results come back in listing order.
    async fn hash_all(
        &self,
        root: &MediaRoot,
        files: Vec<PathBuf>,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> Vec<HashOutcome> {
        let mut handles = Vec::with_capacity(files.len());
        for file in files {
            let sem = semaphore.clone();
            let cancel = cancel.clone();
            let file_name = relative_name(&root.path, &file);
            handles.push(tokio::spawn(async move {
                let fallback_name = file_name.clone();
                let Ok(_permit) = sem.acquire_owned().await else {
                    return HashOutcome::Cancelled;
                };
                if cancel.is_cancelled() {
                    return HashOutcome::Cancelled;
                }
                let walked = file.clone();
                match tokio::task::spawn_blocking(move || inspect(&walked, file_name)).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(file = %file.display(), error = %e, "Hash task panicked");
                        HashOutcome::Unreadable {
                            path: file,
                            file_name: fallback_name,
                        }
                    }
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::warn!(error = %e, "Hash task failed to join"),
            }
        }
        outcomes
    }

    /// Phase 2 for one candidate.
    async fn process(&self, root: &MediaRoot, candidate: Candidate) -> Processed {
        let store = &self.inner.store;
        let key = self.key_for(root, &candidate);

        let existing = match store.lookup(&key) {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(file = %candidate.path.display(), error = %e, "Catalog lookup failed");
                return Processed::new(FileOutcome::Failed);
            }
        };

        if let Some(entry) = existing.as_ref().filter(|e| is_unchanged(e, &candidate)) {
            return self.refresh_unchanged(entry, &key, &candidate).await;
        }

        let info = match self.inner.prober.probe(&candidate.path).await {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!(
                    file = %candidate.path.display(),
                    prober = self.inner.prober.name(),
                    kind = e.kind(),
                    error = %e,
                    "Failed to probe file"
                );
                return Processed::new(FileOutcome::Failed);
            }
        };

        let mut thumbnail_failed = false;
        let thumbnail = match self
            .inner
            .thumbnailer
            .ensure_thumbnail(&candidate.path, &self.inner.settings.thumbnail_dir, info.duration_secs)
            .await
        {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(
                    file = %candidate.path.display(),
                    kind = e.kind(),
                    error = %e,
                    "Failed to generate thumbnail"
                );
                thumbnail_failed = true;
                existing.as_ref().and_then(|e| e.thumbnail.clone())
            }
        };

        let fields = EntryFields {
            root_id: Some(root.id),
            file_name: candidate.file_name,
            path: candidate.path.clone(),
            fingerprint: candidate.fingerprint,
            duration_secs: info.duration_secs,
            width: info.width,
            height: info.height,
            format: info.format,
            codec: info.codec,
            size_bytes: candidate.size_bytes,
            thumbnail,
            file_created: candidate.file_created,
            scanned_at: Utc::now(),
        };

        match store.upsert(&key, fields) {
            Ok(upserted) => {
                tracing::debug!(
                    file = %candidate.path.display(),
                    entry_id = %upserted.entry.id,
                    created = upserted.created,
                    "Cataloged file"
                );
                Processed {
                    outcome: if upserted.created {
                        FileOutcome::Created
                    } else {
                        FileOutcome::Updated
                    },
                    thumbnail_failed,
                }
            }
            Err(e) => {
                tracing::warn!(file = %candidate.path.display(), error = %e, "Failed to store entry");
                Processed {
                    outcome: FileOutcome::Failed,
                    thumbnail_failed,
                }
            }
        }
    }

    /// An unchanged file is not probed again; only a missing thumbnail is
    /// regenerated.
    async fn refresh_unchanged(
        &self,
        entry: &CatalogEntry,
        key: &IdentityKey,
        candidate: &Candidate,
    ) -> Processed {
        let store = &self.inner.store;
        let thumbnail_present = entry.thumbnail.as_deref().is_some_and(Path::exists);

        if !thumbnail_present {
            match self
                .inner
                .thumbnailer
                .ensure_thumbnail(&candidate.path, &self.inner.settings.thumbnail_dir, entry.duration_secs)
                .await
            {
                Ok(path) => {
                    let fields = EntryFields {
                        root_id: entry.root_id,
                        file_name: candidate.file_name.clone(),
                        path: candidate.path.clone(),
                        fingerprint: candidate.fingerprint.clone(),
                        duration_secs: entry.duration_secs,
                        width: entry.width,
                        height: entry.height,
                        format: entry.format.clone(),
                        codec: entry.codec.clone(),
                        size_bytes: candidate.size_bytes,
                        thumbnail: Some(path),
                        file_created: candidate.file_created,
                        scanned_at: Utc::now(),
                    };
                    return match store.upsert(key, fields) {
                        Ok(_) => {
                            tracing::debug!(file = %candidate.path.display(), "Restored missing thumbnail");
                            Processed::new(FileOutcome::Updated)
                        }
                        Err(e) => {
                            tracing::warn!(file = %candidate.path.display(), error = %e, "Failed to store entry");
                            Processed::new(FileOutcome::Failed)
                        }
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        file = %candidate.path.display(),
                        kind = e.kind(),
                        error = %e,
                        "Failed to regenerate thumbnail"
                    );
                    return match store.mark_scanned(entry.id, Utc::now()) {
                        Ok(()) => Processed {
                            outcome: FileOutcome::Unchanged,
                            thumbnail_failed: true,
                        },
                        Err(e) => {
                            tracing::warn!(file = %candidate.path.display(), error = %e, "Failed to refresh entry");
                            Processed {
                                outcome: FileOutcome::Failed,
                                thumbnail_failed: true,
                            }
                        }
                    };
                }
            }
        }

        match store.mark_scanned(entry.id, Utc::now()) {
            Ok(()) => {
                tracing::trace!(file = %candidate.path.display(), "File unchanged");
                Processed::new(FileOutcome::Unchanged)
            }
            Err(e) => {
                tracing::warn!(file = %candidate.path.display(), error = %e, "Failed to refresh entry");
                Processed::new(FileOutcome::Failed)
            }
        }
    }

    /// Delete this root's entries that are gone from disk or were not seen.
    ///
    /// Returns `(deleted, failed deletions)`.
    fn reclaim(
        &self,
        root: &MediaRoot,
        observed: &HashSet<IdentityKey>,
        protected: &HashSet<PathBuf>,
    ) -> Result<(usize, usize)> {
        let store = &self.inner.store;
        let identity = self.inner.settings.identity;
        let mut deleted = 0;
        let mut failed = 0;

        for entry in store.list_by_root(root.id)? {
            let gone = path_is_gone(&entry.path);
            let unseen =
                !observed.contains(&entry.identity_key(identity)) && !protected.contains(&entry.path);
            if !(gone || unseen) {
                continue;
            }

            match store.delete(entry.id) {
                Ok(_) => {
                    tracing::debug!(
                        entry_id = %entry.id,
                        file = %entry.path.display(),
                        gone,
                        "Reclaimed catalog entry"
                    );
                    deleted += 1;
                }
                Err(e) => {
                    tracing::warn!(entry_id = %entry.id, error = %e, "Failed to delete entry");
                    failed += 1;
                }
            }
        }

        Ok((deleted, failed))
    }
}

/// Phase 1 work for one listed file, run on the blocking pool.
fn inspect(walked: &Path, file_name: String) -> HashOutcome {
    let classify = |e: vidsync_common::Error, path: PathBuf, file_name: String| {
        if e.is_vanished() {
            tracing::debug!(file = %path.display(), "File vanished before processing");
            HashOutcome::Vanished
        } else {
            tracing::warn!(file = %path.display(), error = %e, "Failed to read file");
            HashOutcome::Unreadable { path, file_name }
        }
    };

    let path = match std::fs::canonicalize(walked) {
        Ok(path) => path,
        Err(e) => return classify(e.into(), walked.to_path_buf(), file_name),
    };
    let meta = match std::fs::metadata(&path) {
        Ok(meta) => meta,
        Err(e) => return classify(e.into(), path, file_name),
    };
    let fingerprint = match fingerprint(&path) {
        Ok(hash) => hash,
        Err(e) => return classify(e, path, file_name),
    };

    let file_created = meta
        .created()
        .or_else(|_| meta.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    HashOutcome::Ready(Candidate {
        path,
        file_name,
        fingerprint,
        size_bytes: meta.len(),
        file_created,
    })
}

/// Keep the last file in listing order for each fingerprint.
fn collapse_duplicates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut last: HashMap<&str, usize> = HashMap::new();
    for (i, candidate) in candidates.iter().enumerate() {
        last.insert(candidate.fingerprint.as_str(), i);
    }
    let keep: HashSet<usize> = last.into_values().collect();

    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(i, c)| {
            if keep.contains(&i) {
                Some(c)
            } else {
                tracing::debug!(file = %c.path.display(), fingerprint = %c.fingerprint, "Skipping duplicate content");
                None
            }
        })
        .collect()
}

fn is_unchanged(entry: &CatalogEntry, candidate: &Candidate) -> bool {
    entry.fingerprint == candidate.fingerprint
        && entry.path == candidate.path
        && entry.size_bytes == candidate.size_bytes
        && entry.file_name == candidate.file_name
}

/// Only a definite "not found" counts; other stat errors keep the entry.
fn path_is_gone(path: &Path) -> bool {
    matches!(std::fs::metadata(path), Err(e) if e.kind() == std::io::ErrorKind::NotFound)
}
