//! File metadata records flowing from the traverser to a sink

use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata for one file, keyed remotely by its identifier.
///
/// The identifier is the document key and is left out of the serialized body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// Path as seen during the walk, not normalized
    pub path: String,
    /// Modification time in seconds since the Unix epoch
    #[serde(rename = "mtime")]
    pub modified_at: i64,
    /// Length in bytes
    pub size: u64,
    /// Platform file identifier (inode number on Unix)
    #[serde(skip)]
    pub identifier: u64,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, modified_at: i64, size: u64, identifier: u64) -> Self {
        Self {
            path: path.into(),
            modified_at,
            size,
            identifier,
        }
    }

    /// Build a record from an entry's (non-followed) metadata.
    pub fn from_metadata(path: &Path, metadata: &Metadata, identifier: u64) -> Self {
        // Platforms without mtime support report the epoch
        let modified_at = metadata.modified().map(epoch_seconds).unwrap_or(0);
        Self {
            path: path.to_string_lossy().into_owned(),
            modified_at,
            size: metadata.len(),
            identifier,
        }
    }

    /// Encode the document body.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Seconds since the Unix epoch, negative for earlier times.
pub fn epoch_seconds(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp()
}
