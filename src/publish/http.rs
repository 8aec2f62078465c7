//! HttpPublisher - one POST per record

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use super::RecordSink;
use super::config::PublisherConfig;
use crate::error::{ConfigError, PublishError};
use crate::record::FileRecord;

/// Publishes each record as its own document, waiting for every response
/// before taking the next record.
pub struct HttpPublisher {
    config: PublisherConfig,
    client: Client,
    delivered: u64,
}

impl HttpPublisher {
    pub fn new(config: PublisherConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = build_client(&config)?;
        Ok(Self {
            config,
            client,
            delivered: 0,
        })
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }
}

impl RecordSink for HttpPublisher {
    fn deliver(&mut self, record: FileRecord) -> Result<(), PublishError> {
        let url = self.config.document_url(record.identifier);
        let body = record.to_json().map_err(|source| PublishError::Serialize {
            path: record.path.clone(),
            source,
        })?;

        debug!("POST {} ({})", url, record.path);
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|source| PublishError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = read_body(&url, response);
        check_status(&url, status, body, self.config.accept_any_status)?;

        self.delivered += 1;
        Ok(())
    }

    fn delivered(&self) -> u64 {
        self.delivered
    }
}

/// Build the shared blocking client. Without a configured timeout requests
/// may wait indefinitely.
pub(super) fn build_client(config: &PublisherConfig) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(ConfigError::Client)
}

/// Read the whole response body. A failed read is logged and yields an empty
/// body: the write has already happened.
pub(super) fn read_body(url: &str, response: Response) -> String {
    match response.text() {
        Ok(body) => body,
        Err(err) => {
            warn!("failed to read response body from {}: {}", url, err);
            String::new()
        }
    }
}

pub(super) fn check_status(
    url: &str,
    status: StatusCode,
    body: String,
    accept_any_status: bool,
) -> Result<(), PublishError> {
    if status.is_success() {
        return Ok(());
    }
    if accept_any_status {
        warn!("{} answered with status {}, accepting anyway", url, status);
        return Ok(());
    }
    Err(PublishError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
    })
}
