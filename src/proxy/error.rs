//! Proxy failure shapes and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Why a forwarded call did not produce a relayable payload.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Connection refused or deadline exceeded. `detail` comes from the
    /// endpoint that was being called.
    #[error("{service} service is currently unavailable")]
    Unavailable { service: &'static str, detail: &'static str },

    /// The downstream answered but flagged the call as failed.
    #[error("{service} service returned an error")]
    Downstream { service: &'static str, detail: Value },

    /// Anything else (bad status, transport error, ...).
    #[error("Failed to {action}")]
    Other { action: &'static str, message: String },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Downstream { .. } | ProxyError::Other { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::Unavailable { .. } => "unavailable",
            ProxyError::Downstream { .. } => "downstream",
            ProxyError::Other { .. } => "other",
        }
    }

    fn detail(&self) -> Value {
        match self {
            ProxyError::Unavailable { detail, .. } => Value::from(*detail),
            ProxyError::Downstream { detail, .. } => detail.clone(),
            ProxyError::Other { message, .. } => Value::from(message.as_str()),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "message": self.to_string(),
        });
        // A downstream failure without an `error` field relays no detail.
        let detail = self.detail();
        if !detail.is_null() {
            body["error"] = detail;
        }
        (self.status(), Json(body)).into_response()
    }
}
