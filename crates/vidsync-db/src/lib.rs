//! Vidsync-DB: the catalog store.
//!
//! This crate owns storage of media roots and catalog entries. The
//! [`CatalogStore`] trait is the only interface the sync engine and the
//! serving layer use; two implementations are provided:
//!
//! - [`MemoryCatalog`] - in-process maps behind a read/write lock
//! - [`SqliteCatalog`] - SQLite via rusqlite with r2d2 connection pooling
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Root and entry models plus the typed upsert payload
//! - `queries` - SQL query operations
//! - `store` - The store trait
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use vidsync_db::{CatalogStore, MemoryCatalog, NewMediaRoot};
//!
//! let store = MemoryCatalog::new();
//! let root = store
//!     .register_root(NewMediaRoot {
//!         name: "Movies".into(),
//!         path: PathBuf::from("/media/movies"),
//!         recursive: true,
//!     })
//!     .unwrap();
//! assert!(store.list_by_root(root.id).unwrap().is_empty());
//! ```

mod memory;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
mod sqlite;
mod store;

pub use memory::MemoryCatalog;
pub use models::{CatalogEntry, EntryFields, IdentityKey, MediaRoot, NewMediaRoot, Upserted};
pub use sqlite::SqliteCatalog;
pub use store::CatalogStore;
