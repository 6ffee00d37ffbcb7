//! Catalog synchronization.
//!
//! A pass over a media root walks the directory, fingerprints every
//! candidate, probes and thumbnails new or changed files, upserts them into
//! the catalog and finally reclaims entries whose files are gone.

pub mod engine;
pub mod hasher;
mod locks;
pub mod report;
pub mod schedule;
pub mod walker;

pub use engine::{SyncEngine, SyncSettings};
pub use locks::RootLocks;
pub use report::{RootReport, RootStatus, SyncReport, SyncTotals};
pub use schedule::spawn_periodic;
