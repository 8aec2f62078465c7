//! Configuration for the publishers

use std::time::Duration;

use crate::error::ConfigError;

/// Host used when none is given.
pub const DEFAULT_HOST: &str = "localhost:9200";
/// Index that receives the documents.
pub const DEFAULT_NAMESPACE: &str = "filesystem";
/// Document type segment of the URL.
pub const DEFAULT_DOC_TYPE: &str = "file";

/// Where and how records are delivered.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// `host:port`, optionally with an `http://` or `https://` scheme
    pub host: String,
    pub namespace: String,
    pub doc_type: String,
    /// Treat any HTTP response as a successful delivery
    pub accept_any_status: bool,
    /// Per-request timeout. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Records per bulk request; 1 means one request per record
    pub batch_size: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            doc_type: DEFAULT_DOC_TYPE.to_string(),
            accept_any_status: false,
            timeout: None,
            batch_size: 1,
        }
    }
}

impl PublisherConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().trim_end_matches('/').is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        check_name("namespace", &self.namespace)?;
        check_name("document type", &self.doc_type)?;
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize {
                size: self.batch_size,
            });
        }
        Ok(())
    }

    /// Scheme and authority, e.g. `http://localhost:9200`.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{}", host)
        }
    }

    /// Resource path of one document, e.g. `/filesystem/file/101`.
    pub fn document_path(&self, identifier: u64) -> String {
        format!("/{}/{}/{}", self.namespace, self.doc_type, identifier)
    }

    pub fn document_url(&self, identifier: u64) -> String {
        format!("{}{}", self.base_url(), self.document_path(identifier))
    }

    pub fn bulk_url(&self) -> String {
        format!("{}/_bulk", self.base_url())
    }
}

fn check_name(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.contains('/') {
        return Err(ConfigError::InvalidName {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
