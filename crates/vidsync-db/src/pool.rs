//! Database connection pool management.
//!
//! Connection pooling for SQLite via r2d2. Every new connection gets
//! foreign keys enabled, and pending migrations run once when the pool is
//! built. File databases run in WAL mode so readers never block the writer.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use vidsync_common::{Error, Result};

use crate::migrations;

/// Type alias for the database connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Type alias for a pooled database connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const FILE_POOL_SIZE: u32 = 4;

/// Initialize a pool over the SQLite file at `db_path`.
///
/// The file is created if missing. Migrations run before the pool is
/// returned.
///
/// # Example
///
/// ```no_run
/// use vidsync_db::pool::init_pool;
///
/// let pool = init_pool("/var/lib/vidsync/catalog.db").unwrap();
/// let conn = pool.get().unwrap();
/// ```
pub fn init_pool(db_path: impl AsRef<Path>) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path.as_ref())
        .with_init(|conn| {
            conn.execute_batch(
                "PRAGMA foreign_keys = ON;
                 PRAGMA journal_mode = WAL;
                 PRAGMA busy_timeout = 5000;",
            )
        });

    build(manager, FILE_POOL_SIZE)
}

/// Initialize an in-memory pool.
///
/// Each SQLite in-memory connection is its own database, so this pool holds
/// exactly one connection. The data is lost when the pool is dropped.
///
/// ```
/// use vidsync_db::pool::init_memory_pool;
///
/// let pool = init_memory_pool().unwrap();
/// assert_eq!(pool.max_size(), 1);
/// ```
pub fn init_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory()
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));

    build(manager, 1)
}

fn build(manager: SqliteConnectionManager, max_size: u32) -> Result<DbPool> {
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| Error::database(format!("Failed to create connection pool: {}", e)))?;

    let conn = pool
        .get()
        .map_err(|e| Error::database(format!("Failed to get connection for migrations: {}", e)))?;

    migrations::run_migrations(&conn)
        .map_err(|e| Error::database(format!("Failed to run migrations: {}", e)))?;

    Ok(pool)
}

/// Get a connection from the pool.
///
/// Converts the r2d2 error into the common [`Error`] type.
pub fn get_conn(pool: &DbPool) -> Result<PooledConnection> {
    pool.get()
        .map_err(|e| Error::database(format!("Failed to get connection from pool: {}", e)))
}
