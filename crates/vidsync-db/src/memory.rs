//! In-process catalog backed by hash maps.
//!
//! Used by tests and by deployments that do not need the catalog to survive
//! a restart (`backend = "memory"`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use vidsync_common::{EntryId, Error, Result, RootId};

use crate::models::{CatalogEntry, EntryFields, IdentityKey, MediaRoot, NewMediaRoot, Upserted};
use crate::store::{sort_entries, CatalogStore};

#[derive(Default)]
struct State {
    roots: HashMap<RootId, MediaRoot>,
    entries: HashMap<EntryId, CatalogEntry>,
}

impl State {
    /// Oldest entry matching `pred`, ties broken by id.
    fn find(&self, pred: impl Fn(&CatalogEntry) -> bool) -> Option<&CatalogEntry> {
        self.entries
            .values()
            .filter(|e| pred(e))
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
    }

    fn find_key(&self, key: &IdentityKey) -> Option<&CatalogEntry> {
        match key {
            IdentityKey::Path { root_id, file_name } => {
                self.find(|e| e.root_id == *root_id && e.file_name == *file_name)
            }
            IdentityKey::Fingerprint { fingerprint, .. } if fingerprint.is_empty() => None,
            IdentityKey::Fingerprint {
                root_id,
                fingerprint,
            } => self.find(|e| e.root_id == *root_id && e.fingerprint == *fingerprint),
        }
    }
}

/// Catalog store that keeps everything in memory.
#[derive(Default)]
pub struct MemoryCatalog {
    state: RwLock<State>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CatalogStore for MemoryCatalog {
    fn register_root(&self, root: NewMediaRoot) -> Result<MediaRoot> {
        let mut state = self.state.write();
        if let Some(existing) = state.roots.values_mut().find(|r| r.path == root.path) {
            existing.name = root.name;
            existing.recursive = root.recursive;
            return Ok(existing.clone());
        }

        let created = MediaRoot {
            id: RootId::new(),
            name: root.name,
            path: root.path,
            recursive: root.recursive,
            last_scanned: None,
            created_at: Utc::now(),
        };
        state.roots.insert(created.id, created.clone());
        Ok(created)
    }

    fn get_root(&self, id: RootId) -> Result<Option<MediaRoot>> {
        Ok(self.state.read().roots.get(&id).cloned())
    }

    fn list_roots(&self) -> Result<Vec<MediaRoot>> {
        let mut roots: Vec<MediaRoot> = self.state.read().roots.values().cloned().collect();
        roots.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(roots)
    }

    fn mark_root_scanned(&self, id: RootId, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write();
        let root = state
            .roots
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("media_root"))?;
        root.last_scanned = Some(at);
        Ok(())
    }

    fn upsert(&self, key: &IdentityKey, fields: EntryFields) -> Result<Upserted> {
        fields.validate()?;
        let now = Utc::now();

        let mut state = self.state.write();
        let (entry, created) = match state.find_key(key) {
            Some(existing) => (existing.apply(fields, now), false),
            None => (CatalogEntry::from_fields(fields, now), true),
        };
        state.entries.insert(entry.id, entry.clone());
        Ok(Upserted { entry, created })
    }

    fn get(&self, id: EntryId) -> Result<Option<CatalogEntry>> {
        Ok(self.state.read().entries.get(&id).cloned())
    }

    fn get_by_fingerprint(&self, fingerprint: &str) -> Result<Option<CatalogEntry>> {
        if fingerprint.is_empty() {
            return Ok(None);
        }
        Ok(self
            .state
            .read()
            .find(|e| e.fingerprint == fingerprint)
            .cloned())
    }

    fn get_by_root_fingerprint(
        &self,
        root_id: Option<RootId>,
        fingerprint: &str,
    ) -> Result<Option<CatalogEntry>> {
        let key = IdentityKey::Fingerprint {
            root_id,
            fingerprint: fingerprint.to_string(),
        };
        Ok(self.state.read().find_key(&key).cloned())
    }

    fn get_by_identity(
        &self,
        root_id: Option<RootId>,
        file_name: &str,
    ) -> Result<Option<CatalogEntry>> {
        let key = IdentityKey::Path {
            root_id,
            file_name: file_name.to_string(),
        };
        Ok(self.state.read().find_key(&key).cloned())
    }

    fn mark_scanned(&self, id: EntryId, at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.write();
        let entry = state
            .entries
            .get_mut(&id)
            .ok_or_else(|| Error::not_found("catalog_entry"))?;
        entry.last_scanned = at;
        Ok(())
    }

    fn delete(&self, id: EntryId) -> Result<bool> {
        Ok(self.state.write().entries.remove(&id).is_some())
    }

    fn list_all(&self) -> Result<Vec<CatalogEntry>> {
        let mut entries: Vec<CatalogEntry> = self.state.read().entries.values().cloned().collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn list_by_root(&self, root_id: RootId) -> Result<Vec<CatalogEntry>> {
        let mut entries: Vec<CatalogEntry> = self
            .state
            .read()
            .entries
            .values()
            .filter(|e| e.root_id == Some(root_id))
            .cloned()
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::conformance;

    #[test]
    fn test_register_root_is_idempotent_by_path() {
        conformance::register_root_is_idempotent_by_path(&MemoryCatalog::new());
    }

    #[test]
    fn test_mark_root_scanned() {
        conformance::mark_root_scanned(&MemoryCatalog::new());
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        conformance::upsert_creates_then_updates(&MemoryCatalog::new());
    }

    #[test]
    fn test_upsert_rejects_invalid_fields() {
        conformance::upsert_rejects_invalid_fields(&MemoryCatalog::new());
    }

    #[test]
    fn test_fingerprint_lookup() {
        conformance::fingerprint_lookup(&MemoryCatalog::new());
    }

    #[test]
    fn test_fingerprint_lookup_is_scoped_to_root() {
        conformance::fingerprint_lookup_is_scoped_to_root(&MemoryCatalog::new());
    }

    #[test]
    fn test_identity_lookup_distinguishes_roots() {
        conformance::identity_lookup_distinguishes_roots(&MemoryCatalog::new());
    }

    #[test]
    fn test_delete_and_mark_scanned() {
        conformance::delete_and_mark_scanned(&MemoryCatalog::new());
    }

    #[test]
    fn test_listing_is_ordered() {
        conformance::listing_is_ordered(&MemoryCatalog::new());
    }
}
