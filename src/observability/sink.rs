//! Append-only NDJSON log files.
//!
//! # Responsibilities
//! - Create the log directory once at startup
//! - Open one append handle per concern (requests, model ops, driver queries)
//! - Append one JSON record per line, best effort
//!
//! # Design Decisions
//! - A sink that fails to open is disabled, not fatal
//! - Each record is one `write_all` under the sink's mutex, so lines from
//!   concurrent requests never interleave
//! - Write errors are swallowed after a debug event

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::config::ObservabilityConfig;

/// Request log (one record per HTTP request).
pub const REQUEST_LOG: &str = "api.log";
/// Slow model-level operations.
pub const MODEL_LOG: &str = "model_operations.log";
/// Slow driver-level collection calls.
pub const QUERY_LOG: &str = "db_queries.log";

/// Current UTC time as an RFC 3339 string with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A shared, append-only NDJSON file.
#[derive(Clone, Debug, Default)]
pub struct LogSink {
    inner: Option<Arc<SinkFile>>,
}

#[derive(Debug)]
struct SinkFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl LogSink {
    /// Open `path` for appending. Returns a disabled sink if that fails.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Self {
                inner: Some(Arc::new(SinkFile {
                    path,
                    file: Mutex::new(file),
                })),
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Log file unavailable, sink disabled");
                Self::disabled()
            }
        }
    }

    /// A sink that drops every record.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.as_deref().map(|f| f.path.as_path())
    }

    /// Append one record as a single line. Never fails.
    pub fn append<T: Serialize>(&self, record: &T) {
        let Some(sink) = self.inner.as_deref() else {
            return;
        };

        let mut line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!(error = %e, "Dropping unserializable log record");
                return;
            }
        };
        line.push(b'\n');

        let mut file = sink.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = file.write_all(&line) {
            tracing::debug!(path = %sink.path.display(), error = %e, "Log append failed");
        }
    }
}

/// Process-wide logging context, built once at startup and injected into
/// the request logger and both auditors.
#[derive(Clone, Debug, Default)]
pub struct LogContext {
    pub requests: LogSink,
    pub models: LogSink,
    pub queries: LogSink,
}

impl LogContext {
    /// Create `dir` (recursively) and open the three log files inside it.
    pub fn init(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        if let Err(e) = fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot create log directory, file logging disabled");
            return Self::disabled();
        }

        tracing::debug!(dir = %dir.display(), "Log directory ready");
        Self {
            requests: LogSink::open(dir.join(REQUEST_LOG)),
            models: LogSink::open(dir.join(MODEL_LOG)),
            queries: LogSink::open(dir.join(QUERY_LOG)),
        }
    }

    pub fn from_config(config: &ObservabilityConfig) -> Self {
        if config.file_logging {
            Self::init(&config.log_dir)
        } else {
            Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Read every parseable record from an NDJSON file.
///
/// Lines that are not valid JSON are skipped.
pub fn read_records(path: impl AsRef<Path>) -> io::Result<Vec<serde_json::Value>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(value) = serde_json::from_str(&line) {
            records.push(value);
        }
    }
    Ok(records)
}
