//! Filesystem traversal
//!
//! The traverser walks a root depth-first (siblings in name order) and turns
//! every non-directory entry into a [`FileRecord`](crate::FileRecord). Entry
//! errors and entries without an identifier are logged and skipped, never
//! fatal.
//!
//! - `Traverser::scan`: lazy iterator of records
//! - `Traverser::run`: pushes records into a queue, then an explicit
//!   [`ScanEvent::Finished`] marker

mod config;
mod filter;
mod identifier;
mod traverser;

pub use config::ScanConfig;
pub use filter::EntryFilter;
pub use identifier::file_identifier;
pub use traverser::{Scan, ScanEvent, ScanSummary, Traverser};
