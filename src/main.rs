//! CLI entry point for fsindex

use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, SystemTime};

use clap::Parser;
use fsindex::publish::{DEFAULT_DOC_TYPE, DEFAULT_HOST, DEFAULT_NAMESPACE};
use fsindex::{
    BulkPublisher, HttpPublisher, JsonLinesSink, Pipeline, PipelineConfig, PublisherConfig,
    RunSummary, ScanConfig, Traverser,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fsindex")]
#[command(about = "Scan a directory tree and place basic file information into an Elasticsearch server")]
#[command(version)]
struct Args {
    /// Directory to scan
    path: PathBuf,

    /// The Elasticsearch host (host:port, optionally with http:// or https://)
    #[arg(long, env = "FSINDEX_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Index that receives the documents
    #[arg(long = "index", value_name = "NAME", default_value = DEFAULT_NAMESPACE)]
    index: String,

    /// Document type segment of the URL
    #[arg(long = "doc-type", value_name = "NAME", default_value = DEFAULT_DOC_TYPE)]
    doc_type: String,

    /// Records per request through the bulk API (1 = one request per file)
    #[arg(long = "batch-size", value_name = "N", default_value = "1")]
    batch_size: usize,

    /// Records buffered between the scanner and the publisher (0 = hand over directly)
    #[arg(long = "queue-capacity", value_name = "N", default_value = "0")]
    queue_capacity: usize,

    /// Per-request timeout, e.g. 30s or 2m (default: wait forever)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration_string)]
    timeout: Option<Duration>,

    /// Treat any HTTP response as success, whatever its status
    #[arg(long = "accept-any-status")]
    accept_any_status: bool,

    /// Descend only N levels deep
    #[arg(short = 'L', long = "level")]
    level: Option<usize>,

    /// Skip entries whose name matches pattern (can be used multiple times)
    #[arg(short = 'I', long = "ignore")]
    ignore: Vec<String>,

    /// Honour .gitignore/.ignore files and skip hidden entries
    #[arg(long = "respect-ignore")]
    respect_ignore: bool,

    /// Only index files modified more recently than DURATION ago
    /// Duration format: 30s, 5m, 1h, 7d, 2w, 3M, 1y
    #[arg(long = "newer", value_name = "DURATION", value_parser = parse_duration_string)]
    newer: Option<Duration>,

    /// Only index files modified longer than DURATION ago
    /// Duration format: 30s, 5m, 1h, 7d, 2w, 3M, 1y
    #[arg(long = "older", value_name = "DURATION", value_parser = parse_duration_string)]
    older: Option<Duration>,

    /// Print the records as JSON lines instead of sending them
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Log every request
    #[arg(short, long)]
    verbose: bool,
}

/// Parse a duration string like "1h", "7d", "2w" into a Duration.
/// Uses the humantime crate (s, m, h, d, w, M, y and their long forms).
fn parse_duration_string(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s.trim()).map_err(|e| e.to_string())
}

/// `now - duration`, clamped at the epoch.
fn ago(now: SystemTime, duration: Duration) -> SystemTime {
    now.checked_sub(duration).unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Install the tracing subscriber. Logs go to stderr so dry-run output on
/// stdout stays machine readable. RUST_LOG overrides the default filter.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("fsindex=debug,warn")
        } else {
            EnvFilter::new("fsindex=info,warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Render an error followed by each of its causes, separated by `: `.
/// Causes whose text the message already carries are not repeated.
fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn run(args: &Args) -> fsindex::Result<RunSummary> {
    let now = SystemTime::now();
    let scan_config = ScanConfig {
        max_depth: args.level,
        ignore_patterns: args.ignore.clone(),
        respect_ignore_files: args.respect_ignore,
        newer_than: args.newer.map(|d| ago(now, d)),
        older_than: args.older.map(|d| ago(now, d)),
    };

    let publisher_config = PublisherConfig {
        host: args.host.clone(),
        namespace: args.index.clone(),
        doc_type: args.doc_type.clone(),
        accept_any_status: args.accept_any_status,
        timeout: args.timeout,
        batch_size: args.batch_size,
    };
    publisher_config.validate()?;

    let pipeline = Pipeline::new(
        Traverser::new(scan_config)?,
        PipelineConfig {
            queue_capacity: args.queue_capacity,
        },
    );

    if args.dry_run {
        let mut sink = JsonLinesSink::new(publisher_config, io::stdout().lock());
        pipeline.run(&args.path, &mut sink)
    } else if publisher_config.batch_size > 1 {
        let mut sink = BulkPublisher::new(publisher_config)?;
        pipeline.run(&args.path, &mut sink)
    } else {
        let mut sink = HttpPublisher::new(publisher_config)?;
        pipeline.run(&args.path, &mut sink)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}
