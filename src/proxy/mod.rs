//! Proxy controllers for the ML and analytics services.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → ml.rs / analytics.rs (pick endpoint, filter params)
//!     → client.rs (one outbound call under a fixed deadline)
//!     → relay payload (200) or error.rs envelope (500 / 503)
//! ```

pub mod analytics;
pub mod client;
pub mod error;
pub mod ml;

pub use client::{Endpoint, ServiceClient, CONNECTION_FAILED};
pub use error::ProxyError;

use axum::{body::Bytes, response::Response, Router};

use crate::http::response::{parse_json_body, ApiError};
use crate::http::server::AppState;

/// Routes mounted under `/api/ml` and `/api/analytics`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/ml", ml::routes())
        .nest("/api/analytics", analytics::routes())
}

/// Forward an inbound JSON body unchanged.
async fn forward_body(
    client: &ServiceClient,
    endpoint: &Endpoint,
    body: Bytes,
) -> Result<Response, ApiError> {
    let payload = parse_json_body(&body)?;
    Ok(client.post_json(endpoint, &payload).await?)
}
