//! Traverser - walks a root and produces file records

use std::fs::Metadata;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use crossbeam_channel::Sender;
use ignore::{DirEntry, Walk, WalkBuilder};
use tracing::{debug, warn};

use super::config::ScanConfig;
use super::filter::EntryFilter;
use super::identifier::file_identifier;
use crate::error::ConfigError;
use crate::record::FileRecord;

/// Item carried by the record queue.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    /// A discovered file
    File(FileRecord),
    /// End of scan. Sent exactly once, after the last file.
    Finished(ScanSummary),
}

/// Counters for one traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Records emitted
    pub files: u64,
    /// Directories visited (the root included)
    pub directories: u64,
    /// Entries skipped because of an error or a missing identifier
    pub skipped: u64,
    /// Files left out by the modification-time window
    pub filtered: u64,
    /// Whether the end-of-scan marker reached the consumer
    pub completed: bool,
}

/// Filesystem traverser.
#[derive(Debug)]
pub struct Traverser {
    config: ScanConfig,
    filter: Arc<EntryFilter>,
}

impl Traverser {
    pub fn new(config: ScanConfig) -> Result<Self, ConfigError> {
        let filter = EntryFilter::new(&config)?;
        Ok(Self {
            config,
            filter: Arc::new(filter),
        })
    }

    /// Lazily walk `root`. The iterator is finite and cannot be restarted.
    pub fn scan(&self, root: &Path) -> Scan {
        Scan {
            walk: self.build_walk(root),
            filter: Arc::clone(&self.filter),
            summary: ScanSummary::default(),
        }
    }

    /// Walk `root`, sending each record to `tx` and then a `Finished` marker.
    ///
    /// Stops early, without a marker, once the receiving side is dropped.
    pub fn run(&self, root: &Path, tx: &Sender<ScanEvent>) -> ScanSummary {
        let mut scan = self.scan(root);
        while let Some(record) = scan.next() {
            if tx.send(ScanEvent::File(record)).is_err() {
                debug!("record consumer went away, abandoning traversal");
                return scan.summary();
            }
        }

        let mut summary = scan.summary();
        summary.completed = true;
        if tx.send(ScanEvent::Finished(summary)).is_err() {
            debug!("record consumer went away before the end-of-scan marker");
            summary.completed = false;
        }
        summary
    }

    fn build_walk(&self, root: &Path) -> Walk {
        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(self.config.respect_ignore_files)
            .require_git(false)
            .follow_links(false)
            .max_depth(self.config.max_depth)
            .sort_by_file_name(|a, b| a.cmp(b));

        let filter = Arc::clone(&self.filter);
        builder.filter_entry(move |entry| !filter.is_ignored_name(entry.file_name()));

        builder.build()
    }
}

/// Iterator over the records of one traversal.
pub struct Scan {
    walk: Walk,
    filter: Arc<EntryFilter>,
    summary: ScanSummary,
}

impl Scan {
    /// Counters accumulated so far.
    pub fn summary(&self) -> ScanSummary {
        self.summary
    }

    fn visit(&mut self, entry: Result<DirEntry, ignore::Error>) -> Option<FileRecord> {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping entry: {}", err);
                self.summary.skipped += 1;
                return None;
            }
        };

        if is_directory(&entry) {
            self.summary.directories += 1;
            return None;
        }

        let metadata = entry.metadata();
        self.admit(entry.path(), metadata, file_identifier)
    }

    /// Turn the `lstat` result of a non-directory entry into a record, or
    /// count why it was left out.
    fn admit(
        &mut self,
        path: &Path,
        metadata: Result<Metadata, ignore::Error>,
        identify: impl Fn(&Metadata) -> Option<u64>,
    ) -> Option<FileRecord> {
        let metadata = match metadata {
            Ok(m) => m,
            Err(err) => {
                warn!("skipping {}: {}", path.display(), err);
                self.summary.skipped += 1;
                return None;
            }
        };

        if self.filter.has_time_window() && !self.in_time_window(path, metadata.modified()) {
            self.summary.filtered += 1;
            return None;
        }

        let Some(identifier) = identify(&metadata) else {
            warn!("skipping {}: no file identifier available", path.display());
            self.summary.skipped += 1;
            return None;
        };

        self.summary.files += 1;
        Some(FileRecord::from_metadata(path, &metadata, identifier))
    }

    /// A file whose modification time cannot be read is outside any window.
    fn in_time_window(&self, path: &Path, modified: io::Result<SystemTime>) -> bool {
        match modified {
            Ok(modified) => self.filter.passes_time_window(modified),
            Err(err) => {
                warn!("filtering {}: no modification time: {}", path.display(), err);
                false
            }
        }
    }
}

/// Directories are counted, never recorded. A root that links to a directory
/// is walked by `ignore`, so it counts as one too.
fn is_directory(entry: &DirEntry) -> bool {
    match entry.file_type() {
        Some(ft) if ft.is_dir() => true,
        Some(_) if entry.depth() == 0 && entry.path_is_symlink() => entry.path().is_dir(),
        _ => false,
    }
}

impl Iterator for Scan {
    type Item = FileRecord;

    fn next(&mut self) -> Option<FileRecord> {
        loop {
            let entry = self.walk.next()?;
            if let Some(record) = self.visit(entry) {
                return Some(record);
            }
        }
    }
}
