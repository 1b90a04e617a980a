//! Request identification.
//!
//! # Responsibilities
//! - Reuse a caller-supplied `x-request-id` when it is usable
//! - Otherwise generate a UUID v4
//! - Expose the id to handlers through request extensions
//!
//! # Design Decisions
//! - Request ID assigned as early as possible (outermost layer)
//! - Caller ids longer than 128 bytes or with non-visible characters are
//!   replaced, never truncated

use std::fmt;

use axum::http::{HeaderMap, HeaderName, Request};
use uuid::Uuid;

/// Header carrying the correlation identifier.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_CALLER_ID_LEN: usize = 128;

/// Correlation identifier for one inbound request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Take the caller's id from `x-request-id` if acceptable.
    pub fn from_headers_or_new(headers: &HeaderMap) -> Self {
        headers
            .get(&X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| is_acceptable(id))
            .map(|id| Self(id.to_string()))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_acceptable(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_CALLER_ID_LEN && id.bytes().all(|b| b.is_ascii_graphic())
}

/// Access the request id attached by the access log layer.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}
