//! Traverser-to-sink pipeline
//!
//! ```text
//! traverser thread ── ScanEvent::File ... ScanEvent::Finished ──▶ bounded queue ──▶ sink (calling thread)
//! ```
//!
//! The queue has one producer and one consumer, so records reach the sink in
//! exactly the order they were produced. When the sink fails the receiver is
//! dropped and the traverser stops at its next send.

use std::path::Path;
use std::thread;

use crossbeam_channel::{Receiver, bounded};
use tracing::{debug, info};

use crate::error::{IndexError, Result};
use crate::publish::RecordSink;
use crate::scan::{ScanEvent, ScanSummary, Traverser};

/// Queue settings.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Records buffered between traverser and sink; 0 hands each record over
    /// directly.
    pub queue_capacity: usize,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Records accepted by the sink
    pub delivered: u64,
    pub scan: ScanSummary,
}

pub struct Pipeline {
    traverser: Traverser,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(traverser: Traverser, config: PipelineConfig) -> Self {
        Self { traverser, config }
    }

    /// Walk `root` and feed every record into `sink`.
    ///
    /// Returns the first delivery error; filesystem anomalies are only logged.
    pub fn run<S: RecordSink>(&self, root: &Path, sink: &mut S) -> Result<RunSummary> {
        std::fs::symlink_metadata(root).map_err(|source| IndexError::RootInaccessible {
            path: root.to_path_buf(),
            source,
        })?;

        info!("scanning {}", root.display());
        let (tx, rx) = bounded::<ScanEvent>(self.config.queue_capacity);

        let scan = thread::scope(|scope| -> Result<ScanSummary> {
            let producer = thread::Builder::new()
                .name("traverser".to_string())
                .spawn_scoped(scope, move || self.traverser.run(root, &tx))?;

            let outcome = drain(&rx, sink);
            // Unblocks the traverser if the sink gave up early
            drop(rx);

            let produced = producer.join().map_err(|_| IndexError::TraverserLost)?;
            debug!(
                "traverser finished: {} files, completed = {}",
                produced.files, produced.completed
            );
            outcome
        })?;

        let summary = RunSummary {
            delivered: sink.delivered(),
            scan,
        };
        info!(
            "indexed {} files ({} directories, {} skipped, {} filtered)",
            summary.delivered, scan.directories, scan.skipped, scan.filtered
        );
        Ok(summary)
    }
}

/// Pull events until the end-of-scan marker and hand each record to `sink`.
pub fn drain<S: RecordSink>(rx: &Receiver<ScanEvent>, sink: &mut S) -> Result<ScanSummary> {
    loop {
        match rx.recv() {
            Ok(ScanEvent::File(record)) => sink.deliver(record)?,
            Ok(ScanEvent::Finished(summary)) => {
                sink.finish()?;
                return Ok(summary);
            }
            Err(_) => return Err(IndexError::TraverserLost),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublishError;
    use crate::record::FileRecord;
    use crate::scan::ScanConfig;
    use crate::test_utils::TestTree;

    /// Collects records; fails on the nth delivery (1-based) when set.
    #[derive(Default)]
    struct RecordingSink {
        received: Vec<FileRecord>,
        fail_at: Option<usize>,
        finished: bool,
    }

    impl RecordSink for RecordingSink {
        fn deliver(&mut self, record: FileRecord) -> std::result::Result<(), PublishError> {
            if self.fail_at == Some(self.received.len() + 1) {
                return Err(PublishError::Output(std::io::Error::other("injected")));
            }
            self.received.push(record);
            Ok(())
        }

        fn finish(&mut self) -> std::result::Result<(), PublishError> {
            self.finished = true;
            Ok(())
        }

        fn delivered(&self) -> u64 {
            self.received.len() as u64
        }
    }

    fn pipeline(queue_capacity: usize) -> Pipeline {
        Pipeline::new(
            Traverser::new(ScanConfig::default()).unwrap(),
            PipelineConfig { queue_capacity },
        )
    }

    fn populated_tree(files: usize) -> TestTree {
        let tree = TestTree::new();
        for i in 0..files {
            tree.add_file(&format!("d{}/f{:03}.txt", i % 3, i), "x");
        }
        tree
    }

    #[test]
    fn test_delivers_in_traversal_order() {
        let tree = populated_tree(20);
        let expected: Vec<FileRecord> = Traverser::new(ScanConfig::default())
            .unwrap()
            .scan(tree.path())
            .collect();

        for capacity in [0, 1, 64] {
            let mut sink = RecordingSink::default();
            let summary = pipeline(capacity).run(tree.path(), &mut sink).unwrap();
            assert_eq!(sink.received, expected, "capacity {}", capacity);
            assert!(sink.finished);
            assert_eq!(summary.delivered, 20);
            assert_eq!(summary.scan.files, 20);
            assert!(summary.scan.completed);
        }
    }

    #[test]
    fn test_stops_at_first_failure() {
        let tree = populated_tree(10);
        let mut sink = RecordingSink {
            fail_at: Some(4),
            ..Default::default()
        };

        let err = pipeline(0).run(tree.path(), &mut sink).unwrap_err();
        assert!(matches!(err, IndexError::Publish(_)));
        assert_eq!(sink.received.len(), 3);
        assert!(!sink.finished);
    }

    #[test]
    fn test_empty_root_succeeds_with_nothing_delivered() {
        let tree = TestTree::new();
        let mut sink = RecordingSink::default();
        let summary = pipeline(0).run(tree.path(), &mut sink).unwrap();
        assert_eq!(summary.delivered, 0);
        assert_eq!(summary.scan.directories, 1);
        assert!(sink.finished);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tree = TestTree::new();
        let mut sink = RecordingSink::default();
        let err = pipeline(0)
            .run(&tree.path().join("nope"), &mut sink)
            .unwrap_err();
        assert!(matches!(err, IndexError::RootInaccessible { .. }));
    }

    #[test]
    fn test_drain_without_marker_reports_lost_traverser() {
        let (tx, rx) = bounded(4);
        tx.send(ScanEvent::File(FileRecord::new("/a", 0, 0, 1)))
            .unwrap();
        drop(tx);

        let mut sink = RecordingSink::default();
        let err = drain(&rx, &mut sink).unwrap_err();
        assert!(matches!(err, IndexError::TraverserLost));
        assert_eq!(sink.received.len(), 1);
        assert!(!sink.finished);
    }
}
