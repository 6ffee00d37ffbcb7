//! The catalog store interface.

use chrono::{DateTime, Utc};
use vidsync_common::{EntryId, Result, RootId};

use crate::models::{CatalogEntry, EntryFields, IdentityKey, MediaRoot, NewMediaRoot, Upserted};

/// Durable collection of media roots and catalog entries.
///
/// The store exclusively owns entry storage. Every upsert replaces an
/// entry's technical field set atomically, so concurrent readers see either
/// the old entry or the new one, never a mix.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
pub trait CatalogStore: Send + Sync {
    /// Register a root, or update name/recursive flag of the root with the
    /// same path.
    fn register_root(&self, root: NewMediaRoot) -> Result<MediaRoot>;

    fn get_root(&self, id: RootId) -> Result<Option<MediaRoot>>;

    /// All roots ordered by path.
    fn list_roots(&self) -> Result<Vec<MediaRoot>>;

    /// Record the completion time of a sync pass for a root.
    fn mark_root_scanned(&self, id: RootId, at: DateTime<Utc>) -> Result<()>;

    /// Insert an entry for `key`, or replace the technical fields of the
    /// entry that `key` already names.
    ///
    /// Fields are validated first; invalid fields are rejected with
    /// `Error::InvalidInput` and nothing is written.
    fn upsert(&self, key: &IdentityKey, fields: EntryFields) -> Result<Upserted>;

    fn get(&self, id: EntryId) -> Result<Option<CatalogEntry>>;

    /// The oldest entry with this fingerprint in any root. An empty
    /// fingerprint never matches.
    fn get_by_fingerprint(&self, fingerprint: &str) -> Result<Option<CatalogEntry>>;

    /// The oldest entry with this fingerprint under `root_id`.
    fn get_by_root_fingerprint(
        &self,
        root_id: Option<RootId>,
        fingerprint: &str,
    ) -> Result<Option<CatalogEntry>>;

    /// The entry at `file_name` under `root_id`.
    fn get_by_identity(&self, root_id: Option<RootId>, file_name: &str)
        -> Result<Option<CatalogEntry>>;

    /// Refresh an entry's last-scanned timestamp without touching its fields.
    fn mark_scanned(&self, id: EntryId, at: DateTime<Utc>) -> Result<()>;

    /// Delete an entry. Returns `false` if it did not exist.
    fn delete(&self, id: EntryId) -> Result<bool>;

    /// Every entry, ordered by root, file name, then path.
    fn list_all(&self) -> Result<Vec<CatalogEntry>>;

    /// Entries attributed to `root_id`, ordered by file name, then path.
    fn list_by_root(&self, root_id: RootId) -> Result<Vec<CatalogEntry>>;

    /// Resolve an identity key to its entry.
    fn lookup(&self, key: &IdentityKey) -> Result<Option<CatalogEntry>> {
        match key {
            IdentityKey::Path { root_id, file_name } => self.get_by_identity(*root_id, file_name),
            IdentityKey::Fingerprint {
                root_id,
                fingerprint,
            } => self.get_by_root_fingerprint(*root_id, fingerprint),
        }
    }
}

/// Sort order shared by both backends for listings.
pub(crate) fn sort_entries(entries: &mut [CatalogEntry]) {
    entries.sort_by(|a, b| {
        a.root_id
            .cmp(&b.root_id)
            .then_with(|| a.file_name.cmp(&b.file_name))
            .then_with(|| a.path.cmp(&b.path))
    });
}
