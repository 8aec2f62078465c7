//! Dry-run sink writing one JSON object per line

use std::io::Write;

use serde::Serialize;

use super::RecordSink;
use super::config::PublisherConfig;
use crate::error::PublishError;
use crate::record::FileRecord;

#[derive(Serialize)]
struct DryRunLine<'a> {
    target: String,
    #[serde(flatten)]
    record: &'a FileRecord,
}

/// Writes what would be indexed instead of sending it.
pub struct JsonLinesSink<W: Write> {
    config: PublisherConfig,
    out: W,
    delivered: u64,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(config: PublisherConfig, out: W) -> Self {
        Self {
            config,
            out,
            delivered: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn deliver(&mut self, record: FileRecord) -> Result<(), PublishError> {
        let line = DryRunLine {
            target: self.config.document_path(record.identifier),
            record: &record,
        };
        serde_json::to_writer(&mut self.out, &line).map_err(|source| {
            if source.is_io() {
                PublishError::Output(source.into())
            } else {
                PublishError::Serialize {
                    path: record.path.clone(),
                    source,
                }
            }
        })?;
        writeln!(self.out)?;
        self.delivered += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PublishError> {
        self.out.flush()?;
        Ok(())
    }

    fn delivered(&self) -> u64 {
        self.delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_one_line_per_record() {
        let mut sink = JsonLinesSink::new(PublisherConfig::default(), Vec::new());
        sink.deliver(FileRecord::new("/a.txt", 5, 10, 101)).unwrap();
        sink.deliver(FileRecord::new("/sub/b.txt", 6, 20, 102))
            .unwrap();
        sink.finish().unwrap();
        assert_eq!(sink.delivered(), 2);

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["target"], "/filesystem/file/101");
        assert_eq!(lines[0]["path"], "/a.txt");
        assert_eq!(lines[0]["mtime"], 5);
        assert_eq!(lines[0]["size"], 10);
        assert_eq!(lines[1]["target"], "/filesystem/file/102");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_output_error() {
        let mut sink = JsonLinesSink::new(PublisherConfig::default(), BrokenPipe);
        let err = sink.deliver(FileRecord::new("/a", 0, 0, 1)).unwrap_err();
        assert!(matches!(err, PublishError::Output(_)));
    }
}
