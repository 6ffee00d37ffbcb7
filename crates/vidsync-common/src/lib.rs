//! Vidsync-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across vidsync:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for media roots and catalog entries
//! - **Core Types**: The identity strategy used to match files to entries
//! - **Path Utilities**: The extension allow-list used by the directory walker
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use vidsync_common::{EntryId, IdentityStrategy, Error, Result};
//! use vidsync_common::paths::ExtensionFilter;
//! use std::path::Path;
//!
//! let entry_id = EntryId::new();
//! let strategy = IdentityStrategy::default();
//! assert_eq!(strategy, IdentityStrategy::Path);
//!
//! assert!(ExtensionFilter::default().matches(Path::new("movie.mkv")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("entry"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
