//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → access_log.rs (request id, timing, one log entry per request)
//!     → catalog / proxy handlers
//!     → response.rs (error envelopes)
//!     → Send to client
//! ```

pub mod access_log;
pub mod request;
pub mod response;
pub mod server;

pub use access_log::{access_log_middleware, RequestLogEntry, RequestOutcome};
pub use request::{RequestId, RequestIdExt, X_REQUEST_ID};
pub use response::ApiError;
pub use server::{AppState, HttpServer};
