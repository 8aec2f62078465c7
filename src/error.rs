//! Error types for fsindex
//!
//! Only run-aborting failures live here. Filesystem anomalies met during a
//! walk (permission denied, vanished entries, missing inode) are logged by the
//! traverser and never surface as errors.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for a scan-and-publish run
#[derive(Error, Debug)]
pub enum IndexError {
    /// Delivery of a record failed
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The root path could not be stat'ed
    #[error("cannot access '{}': {source}", path.display())]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record queue closed without an end-of-scan marker
    #[error("traverser stopped before finishing the scan")]
    TraverserLost,

    /// Thread spawn and other I/O failures
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while delivering records to a sink
#[derive(Error, Debug)]
pub enum PublishError {
    /// A record could not be encoded
    #[error("failed to serialize record '{path}': {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Connection refused, DNS failure, timeout and friends
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status
    #[error("{url} answered with status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    /// A bulk request succeeded but some of its items did not
    #[error("bulk request to {url} reported {failed} failed item(s)")]
    BulkItems { url: String, failed: usize },

    /// Writing dry-run output failed
    #[error("failed to write record: {0}")]
    Output(#[from] std::io::Error),
}

/// Configuration errors, caught before any traversal starts
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No host given
    #[error("host must not be empty")]
    EmptyHost,

    /// Namespace or document type unusable as a URL path segment
    #[error("invalid {field} '{value}': must be non-empty and must not contain '/'")]
    InvalidName { field: &'static str, value: String },

    /// Batch size of zero
    #[error("invalid batch size {size}: must be at least 1")]
    InvalidBatchSize { size: usize },

    /// Unparseable glob in the ignore list
    #[error("invalid ignore pattern '{pattern}': {reason}")]
    InvalidIgnorePattern { pattern: String, reason: String },

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Result type alias using IndexError
pub type Result<T> = std::result::Result<T, IndexError>;
