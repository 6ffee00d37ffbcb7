//! Media root query operations.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use vidsync_common::{Error, Result, RootId};

use super::{format_ts, parse_opt_ts, parse_ts, parse_uuid, path_bytes, read_path};
use crate::models::{MediaRoot, NewMediaRoot};

const ROOT_COLUMNS: &str = "id, name, path, recursive, last_scanned, created_at";

fn row_to_root(row: &Row) -> rusqlite::Result<MediaRoot> {
    Ok(MediaRoot {
        id: RootId::from(parse_uuid(0, &row.get::<_, String>(0)?)?),
        name: row.get(1)?,
        path: read_path(row, 2)?,
        recursive: row.get(3)?,
        last_scanned: parse_opt_ts(4, row.get(4)?)?,
        created_at: parse_ts(5, &row.get::<_, String>(5)?)?,
    })
}

/// Get a root by its path.
pub fn get_root_by_path(conn: &Connection, path: &Path) -> Result<Option<MediaRoot>> {
    conn.query_row(
        &format!("SELECT {ROOT_COLUMNS} FROM media_roots WHERE path = ?"),
        [path_bytes(path)],
        row_to_root,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// Insert a root, or update name and recursion of the root at the same path.
pub fn register_root(conn: &Connection, root: NewMediaRoot) -> Result<MediaRoot> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| Error::database(e.to_string()))?;

    let registered = match get_root_by_path(&tx, &root.path)? {
        Some(existing) => {
            tx.execute(
                "UPDATE media_roots SET name = ?, recursive = ? WHERE id = ?",
                params![root.name, root.recursive, existing.id.to_string()],
            )
            .map_err(|e| Error::database(e.to_string()))?;
            MediaRoot {
                name: root.name,
                recursive: root.recursive,
                ..existing
            }
        }
        None => {
            let created = MediaRoot {
                id: RootId::new(),
                name: root.name,
                path: root.path,
                recursive: root.recursive,
                last_scanned: None,
                created_at: Utc::now(),
            };
            tx.execute(
                "INSERT INTO media_roots (id, name, path, recursive, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    created.id.to_string(),
                    created.name,
                    path_bytes(&created.path),
                    created.recursive,
                    format_ts(created.created_at),
                ],
            )
            .map_err(|e| Error::database(e.to_string()))?;
            created
        }
    };

    tx.commit().map_err(|e| Error::database(e.to_string()))?;
    Ok(registered)
}

/// Get a root by ID.
pub fn get_root(conn: &Connection, id: RootId) -> Result<Option<MediaRoot>> {
    conn.query_row(
        &format!("SELECT {ROOT_COLUMNS} FROM media_roots WHERE id = ?"),
        [id.to_string()],
        row_to_root,
    )
    .optional()
    .map_err(|e| Error::database(e.to_string()))
}

/// List all roots ordered by path.
pub fn list_roots(conn: &Connection) -> Result<Vec<MediaRoot>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {ROOT_COLUMNS} FROM media_roots ORDER BY path"))
        .map_err(|e| Error::database(e.to_string()))?;

    let roots = stmt
        .query_map([], row_to_root)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(roots)
}

/// Record when a root was last synchronized.
pub fn mark_root_scanned(conn: &Connection, id: RootId, at: DateTime<Utc>) -> Result<()> {
    let rows = conn
        .execute(
            "UPDATE media_roots SET last_scanned = ? WHERE id = ?",
            params![format_ts(at), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    if rows == 0 {
        return Err(Error::not_found("media_root"));
    }
    Ok(())
}
