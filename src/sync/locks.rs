use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use vidsync_common::RootId;

/// One async mutex per media root.
///
/// Passes over the same root are serialized; passes over different roots
/// never contend.
#[derive(Debug, Default)]
pub struct RootLocks {
    locks: DashMap<RootId, Arc<Mutex<()>>>,
}

impl RootLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, root: RootId) -> Arc<Mutex<()>> {
        self.locks.entry(root).or_default().clone()
    }

    /// Wait for exclusive access to `root`.
    pub async fn acquire(&self, root: RootId) -> OwnedMutexGuard<()> {
        self.lock_for(root).lock_owned().await
    }

    /// Whether a pass over `root` currently holds the lock.
    pub fn is_busy(&self, root: RootId) -> bool {
        self.locks
            .get(&root)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }
}
