//! Outbound calls to a downstream service.
//!
//! # Responsibilities
//! - Issue exactly one request per inbound call, bounded by the endpoint's timeout
//! - Relay successful payloads byte-for-byte
//! - Classify every failure into a [`ProxyError`]
//!
//! # Design Decisions
//! - The whole exchange (connect, send, read body) runs under one
//!   `tokio::time::timeout`, so a slow body counts as a timeout too
//! - No retries and no fallback data

use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, StatusCode},
    response::Response,
};
use serde_json::Value;
use tokio::time;

use super::error::ProxyError;
use crate::observability::metrics;
use crate::store::query::is_truthy;

/// Default 503 detail for an unreachable service.
pub const CONNECTION_FAILED: &str = "Service connection failed.";

/// One downstream route and its call budget.
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    /// Path appended to the service base URL.
    pub path: &'static str,
    /// Deadline for the whole exchange.
    pub timeout: Duration,
    /// Verb phrase used in "Failed to ..." messages.
    pub action: &'static str,
    /// `error` detail of the 503 sent when the service cannot be reached.
    pub unreachable: &'static str,
}

/// Handle to one downstream service.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    name: &'static str,
    base_url: String,
    http: reqwest::Client,
}

impl ServiceClient {
    /// `name` is the display name used in error messages ("ML", "Analytics").
    pub fn new(name: &'static str, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            name,
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Forward a GET with the given query parameters.
    pub async fn get(
        &self,
        endpoint: &Endpoint,
        params: &[(&str, String)],
    ) -> Result<Response, ProxyError> {
        let request = self.http.get(self.url(endpoint)).query(params);
        self.dispatch(endpoint, request).await
    }

    /// Forward a JSON body with POST.
    pub async fn post_json(&self, endpoint: &Endpoint, body: &Value) -> Result<Response, ProxyError> {
        let request = self.http.post(self.url(endpoint)).json(body);
        self.dispatch(endpoint, request).await
    }

    fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path)
    }

    async fn dispatch(
        &self,
        endpoint: &Endpoint,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, ProxyError> {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        };

        let result = match time::timeout(endpoint.timeout, exchange).await {
            Ok(Ok((status, bytes))) => self.relay(endpoint, status, bytes),
            Ok(Err(e)) => Err(self.classify(endpoint, e)),
            Err(_) => Err(self.unavailable(endpoint)),
        };

        if let Err(e) = &result {
            tracing::error!(
                service = self.name,
                path = endpoint.path,
                error = %e,
                "Downstream call failed"
            );
            metrics::record_downstream_failure(self.name, e.kind());
        }
        result
    }

    fn relay(
        &self,
        endpoint: &Endpoint,
        status: reqwest::StatusCode,
        bytes: Bytes,
    ) -> Result<Response, ProxyError> {
        if !status.is_success() {
            return Err(ProxyError::Other {
                action: endpoint.action,
                message: format!("Request failed with status code {}", status.as_u16()),
            });
        }

        let payload: Value = serde_json::from_slice(&bytes).map_err(|e| ProxyError::Other {
            action: endpoint.action,
            message: format!("Invalid JSON from {} service: {}", self.name, e),
        })?;

        if !payload.get("success").is_some_and(is_truthy) {
            return Err(ProxyError::Downstream {
                service: self.name,
                detail: payload.get("error").cloned().unwrap_or(Value::Null),
            });
        }

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .map_err(|e| ProxyError::Other {
                action: endpoint.action,
                message: e.to_string(),
            })
    }

    fn unavailable(&self, endpoint: &Endpoint) -> ProxyError {
        ProxyError::Unavailable {
            service: self.name,
            detail: endpoint.unreachable,
        }
    }

    fn classify(&self, endpoint: &Endpoint, err: reqwest::Error) -> ProxyError {
        if err.is_connect() || err.is_timeout() {
            self.unavailable(endpoint)
        } else {
            ProxyError::Other {
                action: endpoint.action,
                message: err.to_string(),
            }
        }
    }
}
