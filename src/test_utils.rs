//! Test utilities: temporary directory trees, a recording index server and
//! log capture.
//!
//! This module is only compiled for tests and benchmarks.

use std::fs;
use std::io;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tempfile::TempDir;
use tiny_http::{Header, Response, Server};

/// A temporary directory tree for testing.
///
/// The directory is removed when dropped.
pub struct TestTree {
    dir: TempDir,
}

impl TestTree {
    /// Create a new empty temporary directory.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        Self { dir }
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file, creating parent directories as needed.
    pub fn add_file(&self, path: &str, content: &str) -> PathBuf {
        let full_path = self.dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Create a directory (and its parents).
    pub fn add_dir(&self, path: &str) -> PathBuf {
        let full_path = self.dir.path().join(path);
        fs::create_dir_all(&full_path).expect("Failed to create dir");
        full_path
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

/// A request captured by [`FakeIndex`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    /// Parse the body as a single JSON document.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is not JSON")
    }
}

type Responder = dyn Fn(usize, &RecordedRequest) -> (u16, String) + Send + Sync;

/// In-process HTTP server standing in for the remote index.
///
/// Records every request. The responder gets the 1-based request number and
/// the request, and returns the status code and body to answer with.
pub struct FakeIndex {
    server: Arc<Server>,
    host: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeIndex {
    /// Answer every request with `201 Created`.
    pub fn start() -> Self {
        Self::with_responder(|_, _| (201, r#"{"result":"created"}"#.to_string()))
    }

    /// Answer `201` until request `n` (1-based), then `status` from there on.
    pub fn failing_from(n: usize, status: u16) -> Self {
        Self::with_responder(move |i, _| {
            if i >= n {
                (status, r#"{"error":"injected"}"#.to_string())
            } else {
                (201, r#"{"result":"created"}"#.to_string())
            }
        })
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(usize, &RecordedRequest) -> (u16, String) + Send + Sync + 'static,
    {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("Failed to start fake index"));
        let addr = server
            .server_addr()
            .to_ip()
            .expect("Fake index is not listening on TCP");
        let host = addr.to_string();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Box<Responder> = Box::new(responder);

        let handle = {
            let server = Arc::clone(&server);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                for mut request in server.incoming_requests() {
                    let mut body = String::new();
                    let _ = request.as_reader().read_to_string(&mut body);
                    let recorded = RecordedRequest {
                        method: request.method().to_string(),
                        url: request.url().to_string(),
                        content_type: request
                            .headers()
                            .iter()
                            .find(|h| h.field.equiv("Content-Type"))
                            .map(|h| h.value.to_string()),
                        body,
                    };

                    let number = {
                        let mut log = requests.lock().expect("request log poisoned");
                        log.push(recorded.clone());
                        log.len()
                    };
                    let (status, reply) = responder(number, &recorded);
                    let response = Response::from_string(reply)
                        .with_status_code(status)
                        .with_header(
                            Header::from_bytes("Content-Type", "application/json")
                                .expect("static header"),
                        );
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            server,
            host,
            requests,
            handle: Some(handle),
        }
    }

    /// `ip:port` to hand to a publisher.
    pub fn host(&self) -> String {
        self.host.clone()
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

impl Drop for FakeIndex {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// An `ip:port` with nothing listening on it, for connection-refused tests.
pub fn unused_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind a free port");
    let addr = listener.local_addr().expect("Free port has no address");
    drop(listener);
    addr.to_string()
}

/// Shared buffer the capturing subscriber writes into.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return its result along with
/// everything logged at debug level or above, without ANSI colours.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let bytes = buffer.0.lock().expect("log buffer poisoned").clone();
    (result, String::from_utf8_lossy(&bytes).into_owned())
}
