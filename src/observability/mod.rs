//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! startup
//!     → logging.rs (console subscriber)
//!     → sink.rs (LogContext: log dir + api.log, model_operations.log, db_queries.log)
//!     → metrics.rs (optional Prometheus exporter)
//!
//! per request:
//!     http::access_log → LogContext.requests
//!     audit::model     → LogContext.models   (slow only)
//!     audit::collection→ LogContext.queries  (slow only)
//!
//! offline:
//!     summary.rs (per-operation stats for the CLI)
//! ```
//!
//! # Design Decisions
//! - One JSON object per line in every log file
//! - Request ID flows from the access log into handler spans
//! - Logging never fails a request

pub mod logging;
pub mod metrics;
pub mod sink;
pub mod summary;

pub use sink::{LogContext, LogSink};
