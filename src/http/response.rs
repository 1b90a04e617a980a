//! Error responses for the API routes.
//!
//! # Design Decisions
//! - Catalog and basket errors are a JSON envelope `{ "message": ... }`
//! - Proxy failures keep their own `{ success, message, error }` envelope
//! - Store failures are logged server-side; the caller only sees a generic
//!   message
//! - Request bodies are parsed leniently: an empty body reads as `{}`

use axum::{
    body::Bytes,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::proxy::ProxyError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),

    #[error("Internal Server Error")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Proxy(e) => e.status(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Proxy(e) => return e.into_response(),
            other => other,
        };
        if let ApiError::Store(e) = &err {
            tracing::error!(error = %e, "Store operation failed");
        }
        (err.status(), Json(json!({ "message": err.to_string() }))).into_response()
    }
}

/// Parse a JSON request body; empty means `{}`.
pub fn parse_json_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}
