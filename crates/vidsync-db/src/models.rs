//! Catalog models.
//!
//! [`MediaRoot`] and [`CatalogEntry`] map to the `media_roots` and
//! `catalog_entries` tables. [`EntryFields`] is the typed payload the sync
//! engine hands to [`crate::CatalogStore::upsert`]; the store turns it into
//! a full entry with [`CatalogEntry::from_fields`] or [`CatalogEntry::apply`]
//! so both backends build entries the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vidsync_common::{EntryId, Error, IdentityStrategy, Result, RootId};

/// A configured directory to scan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaRoot {
    pub id: RootId,
    pub name: String,
    pub path: PathBuf,
    pub recursive: bool,
    pub last_scanned: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a media root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMediaRoot {
    pub name: String,
    pub path: PathBuf,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

fn default_recursive() -> bool {
    true
}

/// One physical media file as last observed by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub id: EntryId,
    /// Owning root, `None` for ungrouped entries.
    pub root_id: Option<RootId>,
    /// Path relative to the owning root (the bare file name for flat roots).
    pub file_name: String,
    /// Absolute, canonical path of the file.
    pub path: PathBuf,
    /// Hex content digest, empty when the file could not be read.
    pub fingerprint: String,
    pub title: String,
    pub description: String,
    pub duration_secs: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: String,
    pub codec: String,
    pub size_bytes: u64,
    pub thumbnail: Option<PathBuf>,
    pub file_created: Option<DateTime<Utc>>,
    pub last_scanned: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    /// Build a new entry from upsert fields.
    ///
    /// The title defaults to the file stem and the description is empty.
    pub fn from_fields(fields: EntryFields, now: DateTime<Utc>) -> Self {
        let title = default_title(&fields.file_name);
        Self {
            id: EntryId::new(),
            root_id: fields.root_id,
            file_name: fields.file_name,
            path: fields.path,
            fingerprint: fields.fingerprint,
            title,
            description: String::new(),
            duration_secs: fields.duration_secs,
            width: fields.width,
            height: fields.height,
            format: fields.format,
            codec: fields.codec,
            size_bytes: fields.size_bytes,
            thumbnail: fields.thumbnail,
            file_created: fields.file_created,
            last_scanned: fields.scanned_at,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every technical field with `fields`.
    ///
    /// `id`, `title`, `description`, `active` and `created_at` survive.
    pub fn apply(&self, fields: EntryFields, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            root_id: fields.root_id,
            file_name: fields.file_name,
            path: fields.path,
            fingerprint: fields.fingerprint,
            title: self.title.clone(),
            description: self.description.clone(),
            duration_secs: fields.duration_secs,
            width: fields.width,
            height: fields.height,
            format: fields.format,
            codec: fields.codec,
            size_bytes: fields.size_bytes,
            thumbnail: fields.thumbnail,
            file_created: fields.file_created,
            last_scanned: fields.scanned_at,
            active: self.active,
            created_at: self.created_at,
            updated_at: now,
        }
    }

    /// The identity key of this entry under the given strategy.
    pub fn identity_key(&self, strategy: IdentityStrategy) -> IdentityKey {
        IdentityKey::new(strategy, self.root_id, &self.file_name, &self.fingerprint)
    }
}

fn default_title(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
        .to_string()
}

/// Typed upsert payload: everything the sync engine derives from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFields {
    pub root_id: Option<RootId>,
    pub file_name: String,
    pub path: PathBuf,
    pub fingerprint: String,
    pub duration_secs: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: String,
    pub codec: String,
    pub size_bytes: u64,
    pub thumbnail: Option<PathBuf>,
    pub file_created: Option<DateTime<Utc>>,
    pub scanned_at: DateTime<Utc>,
}

impl EntryFields {
    /// Reject field sets that would violate catalog invariants.
    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(Error::invalid_input("file_name must not be empty"));
        }
        if self.path.as_os_str().is_empty() {
            return Err(Error::invalid_input("path must not be empty"));
        }
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(Error::invalid_input(format!(
                "duration must be a non-negative number, got {}",
                self.duration_secs
            )));
        }
        if self.width.is_some() != self.height.is_some() {
            return Err(Error::invalid_input(
                "width and height must both be present or both absent",
            ));
        }
        Ok(())
    }
}

/// The value used to match a file on disk to a catalog entry.
///
/// Both variants are scoped to a root: the same bytes under two roots are two
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    /// (root, root-relative file name)
    Path {
        root_id: Option<RootId>,
        file_name: String,
    },
    /// (root, content fingerprint)
    Fingerprint {
        root_id: Option<RootId>,
        fingerprint: String,
    },
}

impl IdentityKey {
    pub fn new(
        strategy: IdentityStrategy,
        root_id: Option<RootId>,
        file_name: &str,
        fingerprint: &str,
    ) -> Self {
        match strategy {
            IdentityStrategy::Path => Self::Path {
                root_id,
                file_name: file_name.to_string(),
            },
            IdentityStrategy::Fingerprint => Self::Fingerprint {
                root_id,
                fingerprint: fingerprint.to_string(),
            },
        }
    }

    pub fn root_id(&self) -> Option<RootId> {
        match self {
            Self::Path { root_id, .. } | Self::Fingerprint { root_id, .. } => *root_id,
        }
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let root = self
            .root_id()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        match self {
            Self::Path { file_name, .. } => write!(f, "{root}/{file_name}"),
            Self::Fingerprint { fingerprint, .. } => write!(f, "{root}#{fingerprint}"),
        }
    }
}

/// Result of an upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted {
    pub entry: CatalogEntry,
    /// `true` when a new entry was inserted, `false` when one was replaced.
    pub created: bool,
}
