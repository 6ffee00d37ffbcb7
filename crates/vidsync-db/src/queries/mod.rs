//! Database query modules.
//!
//! - roots: media root registration and bookkeeping
//! - entries: catalog entry upsert, lookup, and listing

pub mod entries;
pub mod roots;

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, ValueRef};
use rusqlite::Row;
use uuid::Uuid;

/// Timestamps are stored as fixed-width RFC 3339 so they sort as text.
pub(crate) fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

pub(crate) fn parse_uuid(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Paths are stored as raw bytes so non-UTF-8 names survive a round trip.
#[cfg(unix)]
pub(crate) fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
pub(crate) fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(unix)]
fn bytes_path(raw: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(raw))
}

#[cfg(not(unix))]
fn bytes_path(raw: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(raw).into_owned())
}

/// Read a path column. Accepts BLOB and TEXT values.
pub(crate) fn read_opt_path(row: &Row, idx: usize) -> rusqlite::Result<Option<PathBuf>> {
    match row.get_ref(idx)? {
        ValueRef::Null => Ok(None),
        ValueRef::Blob(raw) | ValueRef::Text(raw) => Ok(Some(bytes_path(raw))),
        other => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "path".into(),
            other.data_type(),
        )),
    }
}

pub(crate) fn read_path(row: &Row, idx: usize) -> rusqlite::Result<PathBuf> {
    read_opt_path(row, idx)?
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(idx, "path".into(), Type::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_sort_as_text() {
        let a = DateTime::parse_from_rfc3339("2024-01-01T00:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        let b = DateTime::parse_from_rfc3339("2024-01-01T00:00:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        assert!(b < a);
        assert!(format_ts(b) < format_ts(a));
    }

    #[test]
    fn test_parse_ts_round_trip() {
        let now = Utc::now();
        let parsed = parse_ts(0, &format_ts(now)).unwrap();
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
        assert!(parse_ts(0, "yesterday").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_round_trip() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (p BLOB)").unwrap();

        let path = Path::new(OsStr::from_bytes(b"/media/caf\xe9.mp4"));
        conn.execute("INSERT INTO t (p) VALUES (?)", [path_bytes(path)])
            .unwrap();

        let loaded = conn
            .query_row("SELECT p FROM t", [], |row| read_path(row, 0))
            .unwrap();
        assert_eq!(loaded, path);
    }

    #[test]
    fn test_read_path_accepts_text() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let loaded = conn
            .query_row("SELECT '/media/a.mp4', NULL", [], |row| {
                Ok((read_path(row, 0)?, read_opt_path(row, 1)?))
            })
            .unwrap();
        assert_eq!(loaded, (PathBuf::from("/media/a.mp4"), None));
    }
}
