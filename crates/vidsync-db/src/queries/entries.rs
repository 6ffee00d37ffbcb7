//! Catalog entry query operations.
//!
//! Entries are matched by [`IdentityKey`]. Lookups that can match more than
//! one row return the oldest (`created_at`, then `id`).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use vidsync_common::{EntryId, Error, Result, RootId};

use super::{format_ts, parse_opt_ts, parse_ts, parse_uuid, path_bytes, read_opt_path, read_path};
use crate::models::{CatalogEntry, EntryFields, IdentityKey, Upserted};

const ENTRY_COLUMNS: &str = "id, root_id, file_name, path, fingerprint, title, description,
    duration_secs, width, height, format, codec, size_bytes, thumbnail, file_created,
    last_scanned, active, created_at, updated_at";

const ORDER_LISTING: &str = "ORDER BY root_id, file_name, path";
const ORDER_OLDEST: &str = "ORDER BY created_at, id LIMIT 1";

fn row_to_entry(row: &Row) -> rusqlite::Result<CatalogEntry> {
    let root_id = row
        .get::<_, Option<String>>(1)?
        .map(|s| parse_uuid(1, &s).map(RootId::from))
        .transpose()?;
    let size: i64 = row.get(12)?;

    Ok(CatalogEntry {
        id: EntryId::from(parse_uuid(0, &row.get::<_, String>(0)?)?),
        root_id,
        file_name: row.get(2)?,
        path: read_path(row, 3)?,
        fingerprint: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        duration_secs: row.get(7)?,
        width: row.get(8)?,
        height: row.get(9)?,
        format: row.get(10)?,
        codec: row.get(11)?,
        size_bytes: u64::try_from(size).unwrap_or(0),
        thumbnail: read_opt_path(row, 13)?,
        file_created: parse_opt_ts(14, row.get(14)?)?,
        last_scanned: parse_ts(15, &row.get::<_, String>(15)?)?,
        active: row.get(16)?,
        created_at: parse_ts(17, &row.get::<_, String>(17)?)?,
        updated_at: parse_ts(18, &row.get::<_, String>(18)?)?,
    })
}

fn query_one(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Option<CatalogEntry>> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE {filter} {ORDER_OLDEST}"),
        params,
        row_to_entry,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

fn query_many(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<CatalogEntry>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE {filter} {ORDER_LISTING}"
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let entries = stmt
        .query_map(params, row_to_entry)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(entries)
}

/// Get an entry by ID.
pub fn get_entry(conn: &Connection, id: EntryId) -> Result<Option<CatalogEntry>> {
    query_one(conn, "id = ?", [id.to_string()])
}

/// Oldest entry with this fingerprint. Empty fingerprints never match.
pub fn get_by_fingerprint(conn: &Connection, fingerprint: &str) -> Result<Option<CatalogEntry>> {
    if fingerprint.is_empty() {
        return Ok(None);
    }
    query_one(conn, "fingerprint = ?", [fingerprint])
}

/// Oldest entry with this fingerprint under `root_id`.
pub fn get_by_root_fingerprint(
    conn: &Connection,
    root_id: Option<RootId>,
    fingerprint: &str,
) -> Result<Option<CatalogEntry>> {
    if fingerprint.is_empty() {
        return Ok(None);
    }
    query_one(
        conn,
        "root_id IS ? AND fingerprint = ?",
        params![root_id.map(|r| r.to_string()), fingerprint],
    )
}

/// Entry at `file_name` under `root_id` (`None` matches ungrouped entries).
pub fn get_by_identity(
    conn: &Connection,
    root_id: Option<RootId>,
    file_name: &str,
) -> Result<Option<CatalogEntry>> {
    query_one(
        conn,
        "root_id IS ? AND file_name = ?",
        params![root_id.map(|r| r.to_string()), file_name],
    )
}

fn find_key(conn: &Connection, key: &IdentityKey) -> Result<Option<CatalogEntry>> {
    match key {
        IdentityKey::Path { root_id, file_name } => get_by_identity(conn, *root_id, file_name),
        IdentityKey::Fingerprint {
            root_id,
            fingerprint,
        } => get_by_root_fingerprint(conn, *root_id, fingerprint),
    }
}

fn write_entry(conn: &Connection, entry: &CatalogEntry, insert: bool) -> Result<()> {
    let sql = if insert {
        "INSERT INTO catalog_entries (root_id, file_name, path, fingerprint, title, description,
            duration_secs, width, height, format, codec, size_bytes, thumbnail, file_created,
            last_scanned, active, created_at, updated_at, id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    } else {
        "UPDATE catalog_entries SET root_id = ?, file_name = ?, path = ?, fingerprint = ?,
            title = ?, description = ?, duration_secs = ?, width = ?, height = ?, format = ?,
            codec = ?, size_bytes = ?, thumbnail = ?, file_created = ?, last_scanned = ?,
            active = ?, created_at = ?, updated_at = ?
         WHERE id = ?"
    };

    conn.execute(
        sql,
        params![
            entry.root_id.map(|r| r.to_string()),
            entry.file_name,
            path_bytes(&entry.path),
            entry.fingerprint,
            entry.title,
            entry.description,
            entry.duration_secs,
            entry.width,
            entry.height,
            entry.format,
            entry.codec,
            i64::try_from(entry.size_bytes).unwrap_or(i64::MAX),
            entry.thumbnail.as_deref().map(path_bytes),
            entry.file_created.map(format_ts),
            format_ts(entry.last_scanned),
            entry.active,
            format_ts(entry.created_at),
            format_ts(entry.updated_at),
            entry.id.to_string(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(())
}

/// Insert or replace the entry named by `key` in a single transaction.
///
/// The transaction takes the write lock up front so concurrent writers wait
/// on `busy_timeout` instead of failing to upgrade a read lock.
pub fn upsert_entry(conn: &Connection, key: &IdentityKey, fields: EntryFields) -> Result<Upserted> {
    fields.validate()?;
    let now = Utc::now();

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| Error::database(e.to_string()))?;

    let (entry, created) = match find_key(&tx, key)? {
        Some(existing) => (existing.apply(fields, now), false),
        None => (CatalogEntry::from_fields(fields, now), true),
    };
    write_entry(&tx, &entry, created)?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(Upserted { entry, created })
}

/// Refresh an entry's last-scanned time.
pub fn mark_scanned(conn: &Connection, id: EntryId, at: DateTime<Utc>) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE catalog_entries SET last_scanned = ? WHERE id = ?",
            params![format_ts(at), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("catalog_entry"));
    }
    Ok(())
}

/// Delete an entry. Returns whether a row was removed.
pub fn delete_entry(conn: &Connection, id: EntryId) -> Result<bool> {
    let rows = conn
        .execute("DELETE FROM catalog_entries WHERE id = ?", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows > 0)
}

/// All entries ordered by root, file name, and path.
pub fn list_entries(conn: &Connection) -> Result<Vec<CatalogEntry>> {
    query_many(conn, "1 = 1", [])
}

/// Entries under a root.
pub fn list_entries_by_root(conn: &Connection, root_id: RootId) -> Result<Vec<CatalogEntry>> {
    query_many(conn, "root_id = ?", [root_id.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::fields;
    use crate::pool::{get_conn, init_memory_pool};
    use std::path::PathBuf;
    use vidsync_common::IdentityStrategy;

    #[test]
    fn test_optional_columns_round_trip() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let mut f = fields(None, "a.mp4", "h1");
        f.thumbnail = Some(PathBuf::from("/thumbs/a-0011aabb.jpg"));
        f.file_created = Some(Utc::now());
        f.size_bytes = 5_000_000_000;
        let key = IdentityKey::new(IdentityStrategy::Fingerprint, None, "a.mp4", "h1");
        let up = upsert_entry(&conn, &key, f).unwrap();

        let loaded = get_entry(&conn, up.entry.id).unwrap().unwrap();
        assert_eq!(loaded.root_id, None);
        assert_eq!(loaded.thumbnail, Some(PathBuf::from("/thumbs/a-0011aabb.jpg")));
        assert!(loaded.file_created.is_some());
        assert_eq!(loaded.size_bytes, 5_000_000_000);
        assert_eq!(loaded.width, Some(1920));
        assert_eq!(loaded.height, Some(1080));
    }

    #[test]
    fn test_deleting_root_ungroups_entries() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let root = crate::queries::roots::register_root(
            &conn,
            crate::models::NewMediaRoot {
                name: "Movies".into(),
                path: PathBuf::from("/media"),
                recursive: true,
            },
        )
        .unwrap();
        let key = IdentityKey::Path {
            root_id: Some(root.id),
            file_name: "a.mp4".into(),
        };
        let up = upsert_entry(&conn, &key, fields(Some(root.id), "a.mp4", "h1")).unwrap();

        conn.execute("DELETE FROM media_roots WHERE id = ?", [root.id.to_string()])
            .unwrap();

        let loaded = get_entry(&conn, up.entry.id).unwrap().unwrap();
        assert_eq!(loaded.root_id, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_entry_path_is_found_again() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();

        let mut f = fields(None, "caf\u{fffd}.mp4", "h1");
        f.path = PathBuf::from(OsStr::from_bytes(b"/media/caf\xe9.mp4"));
        let key = IdentityKey::new(IdentityStrategy::Path, None, "caf\u{fffd}.mp4", "h1");
        let first = upsert_entry(&conn, &key, f.clone()).unwrap();
        let second = upsert_entry(&conn, &key, f.clone()).unwrap();

        assert!(!second.created);
        assert_eq!(second.entry.id, first.entry.id);
        let loaded = get_entry(&conn, first.entry.id).unwrap().unwrap();
        assert_eq!(loaded.path, f.path);
    }
}
