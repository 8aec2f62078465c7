//! fsindex - Walk a directory tree and index file metadata into a remote document store

pub mod error;
pub mod pipeline;
pub mod publish;
pub mod record;
pub mod scan;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::{ConfigError, IndexError, PublishError, Result};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary};
pub use publish::{BulkPublisher, HttpPublisher, JsonLinesSink, PublisherConfig, RecordSink};
pub use record::FileRecord;
pub use scan::{ScanConfig, ScanEvent, ScanSummary, Traverser, file_identifier};
