//! Record delivery
//!
//! Every consumer of the record stream implements [`RecordSink`]:
//!
//! - [`HttpPublisher`]: one `POST` per record, the baseline
//! - [`BulkPublisher`]: batched NDJSON through the `_bulk` endpoint
//! - [`JsonLinesSink`]: dry run, one JSON line per record on a writer

mod bulk;
mod config;
mod http;
mod jsonl;

pub use bulk::BulkPublisher;
pub use config::{DEFAULT_DOC_TYPE, DEFAULT_HOST, DEFAULT_NAMESPACE, PublisherConfig};
pub use http::HttpPublisher;
pub use jsonl::JsonLinesSink;

use crate::error::PublishError;
use crate::record::FileRecord;

/// Consumer of the record stream.
///
/// Records arrive one at a time in traversal order. Any error ends the run.
pub trait RecordSink {
    /// Deliver (or buffer) one record.
    fn deliver(&mut self, record: FileRecord) -> Result<(), PublishError>;

    /// Called once after the last record of a completed scan.
    fn finish(&mut self) -> Result<(), PublishError> {
        Ok(())
    }

    /// Records accepted by the remote side so far.
    fn delivered(&self) -> u64;
}
