//! SQLite catalog backend.

use std::path::Path;

use chrono::{DateTime, Utc};
use vidsync_common::{EntryId, Result, RootId};

use crate::models::{CatalogEntry, EntryFields, IdentityKey, MediaRoot, NewMediaRoot, Upserted};
use crate::pool::{get_conn, init_memory_pool, init_pool, DbPool};
use crate::queries::{entries, roots};
use crate::store::CatalogStore;

/// Catalog store persisted in SQLite.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: DbPool,
}

impl SqliteCatalog {
    /// Open (or create) the catalog database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            pool: init_pool(path)?,
        })
    }

    /// A throwaway catalog in memory.
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            pool: init_memory_pool()?,
        })
    }

    pub fn from_pool(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl CatalogStore for SqliteCatalog {
    fn register_root(&self, root: NewMediaRoot) -> Result<MediaRoot> {
        let conn = get_conn(&self.pool)?;
        roots::register_root(&conn, root)
    }

    fn get_root(&self, id: RootId) -> Result<Option<MediaRoot>> {
        let conn = get_conn(&self.pool)?;
        roots::get_root(&conn, id)
    }

    fn list_roots(&self) -> Result<Vec<MediaRoot>> {
        let conn = get_conn(&self.pool)?;
        roots::list_roots(&conn)
    }

    fn mark_root_scanned(&self, id: RootId, at: DateTime<Utc>) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        roots::mark_root_scanned(&conn, id, at)
    }

    fn upsert(&self, key: &IdentityKey, fields: EntryFields) -> Result<Upserted> {
        let conn = get_conn(&self.pool)?;
        entries::upsert_entry(&conn, key, fields)
    }

    fn get(&self, id: EntryId) -> Result<Option<CatalogEntry>> {
        let conn = get_conn(&self.pool)?;
        entries::get_entry(&conn, id)
    }

    fn get_by_fingerprint(&self, fingerprint: &str) -> Result<Option<CatalogEntry>> {
        let conn = get_conn(&self.pool)?;
        entries::get_by_fingerprint(&conn, fingerprint)
    }

    fn get_by_root_fingerprint(
        &self,
        root_id: Option<RootId>,
        fingerprint: &str,
    ) -> Result<Option<CatalogEntry>> {
        let conn = get_conn(&self.pool)?;
        entries::get_by_root_fingerprint(&conn, root_id, fingerprint)
    }

    fn get_by_identity(
        &self,
        root_id: Option<RootId>,
        file_name: &str,
    ) -> Result<Option<CatalogEntry>> {
        let conn = get_conn(&self.pool)?;
        entries::get_by_identity(&conn, root_id, file_name)
    }

    fn mark_scanned(&self, id: EntryId, at: DateTime<Utc>) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        entries::mark_scanned(&conn, id, at)
    }

    fn delete(&self, id: EntryId) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        entries::delete_entry(&conn, id)
    }

    fn list_all(&self) -> Result<Vec<CatalogEntry>> {
        let conn = get_conn(&self.pool)?;
        entries::list_entries(&conn)
    }

    fn list_by_root(&self, root_id: RootId) -> Result<Vec<CatalogEntry>> {
        let conn = get_conn(&self.pool)?;
        entries::list_entries_by_root(&conn, root_id)
    }
}
