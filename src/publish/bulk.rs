//! BulkPublisher - batched delivery through the `_bulk` endpoint

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::RecordSink;
use super::config::PublisherConfig;
use super::http::{build_client, check_status, read_body};
use crate::error::{ConfigError, PublishError};
use crate::record::FileRecord;

/// Action line preceding each document in the NDJSON body.
#[derive(Serialize)]
struct BulkAction<'a> {
    index: BulkTarget<'a>,
}

#[derive(Serialize)]
struct BulkTarget<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_type")]
    doc_type: &'a str,
    #[serde(rename = "_id")]
    id: u64,
}

#[derive(Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

impl BulkResponse {
    /// Items whose operation result carries an `error` object.
    fn failed_items(&self) -> usize {
        self.items
            .iter()
            .filter_map(|item| item.as_object()?.values().next())
            .filter(|op| op.get("error").is_some())
            .count()
    }
}

/// Buffers records and sends them `batch_size` at a time.
///
/// Batches go out strictly one after another; the first failing batch ends
/// the run and nothing after it is sent.
pub struct BulkPublisher {
    config: PublisherConfig,
    client: Client,
    pending: Vec<FileRecord>,
    delivered: u64,
}

impl BulkPublisher {
    pub fn new(config: PublisherConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = build_client(&config)?;
        Ok(Self {
            pending: Vec::with_capacity(config.batch_size),
            config,
            client,
            delivered: 0,
        })
    }

    /// Records buffered but not yet sent.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn encode(&self, batch: &[FileRecord]) -> Result<Vec<u8>, PublishError> {
        let mut body = Vec::new();
        for record in batch {
            let action = BulkAction {
                index: BulkTarget {
                    index: &self.config.namespace,
                    doc_type: &self.config.doc_type,
                    id: record.identifier,
                },
            };
            let serialize_err = |source| PublishError::Serialize {
                path: record.path.clone(),
                source,
            };
            serde_json::to_writer(&mut body, &action).map_err(serialize_err)?;
            body.push(b'\n');
            serde_json::to_writer(&mut body, record).map_err(serialize_err)?;
            body.push(b'\n');
        }
        Ok(body)
    }

    fn flush(&mut self) -> Result<(), PublishError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let url = self.config.bulk_url();
        let body = self.encode(&batch)?;

        debug!("POST {} ({} records)", url, batch.len());
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .map_err(|source| PublishError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = read_body(&url, response);
        let accept_any = self.config.accept_any_status;
        if status.is_success() {
            check_items(&url, &body, accept_any)?;
        }
        check_status(&url, status, body, accept_any)?;

        self.delivered += batch.len() as u64;
        self.pending = batch;
        self.pending.clear();
        Ok(())
    }
}

fn check_items(url: &str, body: &str, accept_any_status: bool) -> Result<(), PublishError> {
    let parsed: BulkResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("unreadable bulk response from {}: {}", url, err);
            return Ok(());
        }
    };
    if !parsed.errors {
        return Ok(());
    }
    let failed = parsed.failed_items().max(1);
    if accept_any_status {
        warn!("{} reported {} failed bulk item(s), accepting anyway", url, failed);
        return Ok(());
    }
    Err(PublishError::BulkItems {
        url: url.to_string(),
        failed,
    })
}

impl RecordSink for BulkPublisher {
    fn deliver(&mut self, record: FileRecord) -> Result<(), PublishError> {
        self.pending.push(record);
        if self.pending.len() >= self.config.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PublishError> {
        self.flush()
    }

    fn delivered(&self) -> u64 {
        self.delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeIndex;

    const OK_BODY: &str = r#"{"took":1,"errors":false,"items":[]}"#;

    fn bulk_publisher(host: String, batch_size: usize) -> BulkPublisher {
        BulkPublisher::new(PublisherConfig {
            host,
            batch_size,
            ..Default::default()
        })
        .unwrap()
    }

    fn record(n: u64) -> FileRecord {
        FileRecord::new(format!("/data/{}.txt", n), 1_000 + n as i64, n, 100 + n)
    }

    #[test]
    fn test_batches_and_flushes_remainder() {
        let index = FakeIndex::with_responder(|_, _| (200, OK_BODY.to_string()));
        let mut publisher = bulk_publisher(index.host(), 2);

        for n in 1..=5 {
            publisher.deliver(record(n)).unwrap();
        }
        assert_eq!(index.requests().len(), 2);
        assert_eq!(publisher.pending(), 1);

        publisher.finish().unwrap();
        let requests = index.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(publisher.delivered(), 5);
        assert_eq!(publisher.pending(), 0);

        for request in &requests {
            assert_eq!(request.url, "/_bulk");
            assert_eq!(
                request.content_type.as_deref(),
                Some("application/x-ndjson")
            );
        }

        let lines: Vec<&str> = requests[0].body.lines().collect();
        assert_eq!(lines.len(), 4);
        let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "filesystem");
        assert_eq!(action["index"]["_type"], "file");
        assert_eq!(action["index"]["_id"], 101);
        let doc: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc["path"], "/data/1.txt");
        assert_eq!(doc["mtime"], 1001);
        assert!(doc.get("identifier").is_none());

        let last: Vec<&str> = requests[2].body.lines().collect();
        assert_eq!(last.len(), 2);
        assert!(last[1].contains("/data/5.txt"));
    }

    #[test]
    fn test_finish_without_records_sends_nothing() {
        let index = FakeIndex::start();
        let mut publisher = bulk_publisher(index.host(), 10);
        publisher.finish().unwrap();
        assert!(index.requests().is_empty());
    }

    #[test]
    fn test_item_errors_fail_the_batch() {
        let body = r#"{"errors":true,"items":[
            {"index":{"_id":"101","status":201}},
            {"index":{"_id":"102","status":400,"error":{"type":"mapper_parsing_exception"}}}
        ]}"#;
        let index = FakeIndex::with_responder(move |_, _| (200, body.to_string()));
        let mut publisher = bulk_publisher(index.host(), 2);

        publisher.deliver(record(1)).unwrap();
        let err = publisher.deliver(record(2)).unwrap_err();
        assert!(matches!(err, PublishError::BulkItems { failed: 1, .. }));
        assert_eq!(publisher.delivered(), 0);
    }

    #[test]
    fn test_status_error_fails_the_batch() {
        let index = FakeIndex::with_responder(|_, _| (413, "too large".to_string()));
        let mut publisher = bulk_publisher(index.host(), 1);
        let err = publisher.deliver(record(1)).unwrap_err();
        assert!(matches!(err, PublishError::Status { status: 413, .. }));
    }

    #[test]
    fn test_unparseable_success_body_is_accepted() {
        let index = FakeIndex::with_responder(|_, _| (200, "not json".to_string()));
        let mut publisher = bulk_publisher(index.host(), 1);
        publisher.deliver(record(1)).unwrap();
        assert_eq!(publisher.delivered(), 1);
    }

    #[test]
    fn test_failed_items_counts_only_errors() {
        let response: BulkResponse = serde_json::from_str(
            r#"{"errors":true,"items":[
                {"index":{"status":200}},
                {"index":{"status":409,"error":{}}},
                {"create":{"status":500,"error":{}}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.failed_items(), 2);
    }
}
