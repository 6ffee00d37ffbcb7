//! Sync pass reports.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vidsync_common::RootId;

/// How a root's pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootStatus {
    /// Every file was considered and reclamation ran.
    Completed,
    /// The root could not be listed; nothing was reclaimed.
    RootUnavailable,
    /// The pass was cancelled; nothing was reclaimed.
    Cancelled,
    /// The catalog could not be read or updated for this root.
    Failed,
}

/// Outcome of one pass over one root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootReport {
    pub root_id: RootId,
    pub root_path: PathBuf,
    pub status: RootStatus,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    /// Files that exist but could not be hashed, probed or stored.
    pub failed: usize,
    /// Files that vanished between listing and processing.
    pub skipped: usize,
    /// Candidates collapsed onto another file with the same fingerprint.
    pub duplicates: usize,
    pub thumbnail_failures: usize,
    pub duration_ms: u64,
}

impl RootReport {
    pub fn new(root_id: RootId, root_path: PathBuf) -> Self {
        Self {
            root_id,
            root_path,
            status: RootStatus::Completed,
            created: 0,
            updated: 0,
            unchanged: 0,
            deleted: 0,
            failed: 0,
            skipped: 0,
            duplicates: 0,
            thumbnail_failures: 0,
            duration_ms: 0,
        }
    }

    /// Files that ended up in the catalog during this pass.
    pub fn processed(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Outcome of a pass over several roots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub roots: Vec<RootReport>,
}

/// Counters summed over every root of a [`SyncReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTotals {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub thumbnail_failures: usize,
}

impl SyncReport {
    pub fn totals(&self) -> SyncTotals {
        self.roots.iter().fold(SyncTotals::default(), |mut t, r| {
            t.created += r.created;
            t.updated += r.updated;
            t.unchanged += r.unchanged;
            t.deleted += r.deleted;
            t.failed += r.failed;
            t.skipped += r.skipped;
            t.duplicates += r.duplicates;
            t.thumbnail_failures += r.thumbnail_failures;
            t
        })
    }

    pub fn root(&self, id: RootId) -> Option<&RootReport> {
        self.roots.iter().find(|r| r.root_id == id)
    }
}
