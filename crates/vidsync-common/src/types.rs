//! Core type definitions shared by the catalog and the sync engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a file on disk is matched to its catalog entry across passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityStrategy {
    /// Match by (root, root-relative file name). Content changes update the
    /// entry in place; identical files at two paths are two entries.
    #[default]
    Path,
    /// Match by content fingerprint. Content changes produce a new entry and
    /// reclaim the old one; identical files collapse to one entry.
    Fingerprint,
}

impl fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path => write!(f, "path"),
            Self::Fingerprint => write!(f, "fingerprint"),
        }
    }
}

impl std::str::FromStr for IdentityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "path" => Ok(Self::Path),
            "fingerprint" | "hash" => Ok(Self::Fingerprint),
            _ => Err(format!("Unknown identity strategy: {}", s)),
        }
    }
}
