//! Request logging middleware.
//!
//! # Responsibilities
//! - Assign the correlation id and echo it in the response
//! - Time each request from arrival until its body has been sent
//! - Write one entry per request to the console and to `api.log`
//!
//! # Design Decisions
//! - The response body is wrapped; the entry is finalized at end of stream
//! - If the body or the handler future is dropped first (client went away),
//!   the entry is still written, with outcome `client_disconnected`
//! - The recorder finalizes at most once

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use serde::Serialize;
use tokio::time::Instant;
use tracing::Instrument;

use crate::audit::round_ms;
use crate::http::request::{RequestId, X_REQUEST_ID};
use crate::observability::{metrics, sink, LogSink};

/// How the exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Completed,
    ClientDisconnected,
}

/// One line of `api.log`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    pub time: String,
    pub request_id: String,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub latency_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    pub outcome: RequestOutcome,
}

struct AccessRecorder {
    sink: LogSink,
    started: Instant,
    request_id: RequestId,
    method: String,
    path: String,
    remote_addr: Option<String>,
    status: Option<u16>,
    done: bool,
}

impl AccessRecorder {
    fn start(sink: LogSink, request: &Request, request_id: RequestId) -> Self {
        let path = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| request.uri().path().to_string());
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Self {
            sink,
            started: Instant::now(),
            request_id,
            method: request.method().to_string(),
            path,
            remote_addr,
            status: None,
            done: false,
        }
    }

    fn finish(&mut self, outcome: RequestOutcome) {
        if self.done {
            return;
        }
        self.done = true;

        let entry = RequestLogEntry {
            time: sink::timestamp(),
            request_id: self.request_id.to_string(),
            method: std::mem::take(&mut self.method),
            path: std::mem::take(&mut self.path),
            status: self.status,
            latency_ms: round_ms(self.started.elapsed().as_secs_f64() * 1000.0),
            remote_addr: self.remote_addr.take(),
            outcome,
        };

        tracing::info!(
            request_id = %entry.request_id,
            method = %entry.method,
            path = %entry.path,
            status = ?entry.status,
            latency_ms = entry.latency_ms,
            remote_addr = ?entry.remote_addr,
            outcome = ?entry.outcome,
            "request"
        );
        if let Some(status) = entry.status {
            metrics::record_request(&entry.method, status, entry.latency_ms);
        }
        self.sink.append(&entry);
    }
}

impl Drop for AccessRecorder {
    fn drop(&mut self) {
        self.finish(RequestOutcome::ClientDisconnected);
    }
}

/// Response body that finalizes the access entry when fully sent.
struct LoggedBody {
    inner: Body,
    recorder: Option<AccessRecorder>,
}

impl HttpBody for LoggedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if let Poll::Ready(None) = polled {
            if let Some(mut recorder) = this.recorder.take() {
                recorder.finish(RequestOutcome::Completed);
            }
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl Drop for LoggedBody {
    fn drop(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            // the server may stop polling once a sized body is exhausted
            let outcome = if self.inner.is_end_stream() {
                RequestOutcome::Completed
            } else {
                RequestOutcome::ClientDisconnected
            };
            recorder.finish(outcome);
        }
    }
}

/// Wraps every route: one request-log entry per request/response pair.
pub async fn access_log_middleware(
    State(sink): State<LogSink>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = RequestId::from_headers_or_new(request.headers());
    let mut recorder = AccessRecorder::start(sink, &request, request_id.clone());
    request.extensions_mut().insert(request_id.clone());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %recorder.method,
        path = %recorder.path,
    );
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    recorder.status = Some(response.status().as_u16());

    let (parts, body) = response.into_parts();
    let body = LoggedBody {
        inner: body,
        recorder: Some(recorder),
    };
    Response::from_parts(parts, Body::new(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestIdExt;
    use crate::observability::sink::{read_records, REQUEST_LOG};
    use crate::observability::LogContext;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(sink: LogSink) -> Router {
        Router::new()
            .route("/ok", get(|| async { "hello" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(40)).await;
                    (StatusCode::CREATED, "done")
                }),
            )
            .route(
                "/echo-id",
                get(|req: Request| async move {
                    req.request_id().map(|id| id.to_string()).unwrap_or_default()
                }),
            )
            .layer(middleware::from_fn_with_state(sink, access_log_middleware))
    }

    fn get_request(uri: &str) -> Request {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_one_entry_per_request() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogContext::init(tmp.path());
        let app = app(logs.requests.clone());

        for _ in 0..3 {
            let res = app.clone().oneshot(get_request("/ok?x=1")).await.unwrap();
            let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], b"hello");
        }

        let entries = read_records(tmp.path().join(REQUEST_LOG)).unwrap();
        assert_eq!(entries.len(), 3);
        let first = &entries[0];
        assert_eq!(first["method"], "GET");
        assert_eq!(first["path"], "/ok?x=1");
        assert_eq!(first["status"], 200);
        assert_eq!(first["outcome"], "completed");
        assert!(first["latencyMs"].as_f64().unwrap() >= 0.0);
        assert_ne!(entries[0]["requestId"], entries[1]["requestId"]);
    }

    #[tokio::test]
    async fn test_caller_id_is_reused_and_echoed() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogContext::init(tmp.path());

        let req = Request::builder()
            .uri("/echo-id")
            .header("x-request-id", "trace-42")
            .body(Body::empty())
            .unwrap();
        let res = app(logs.requests.clone()).oneshot(req).await.unwrap();
        assert_eq!(res.headers()["x-request-id"], "trace-42");
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"trace-42");

        let entries = read_records(tmp.path().join(REQUEST_LOG)).unwrap();
        assert_eq!(entries[0]["requestId"], "trace-42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_covers_handler() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogContext::init(tmp.path());

        let res = app(logs.requests.clone()).oneshot(get_request("/slow")).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();

        let entries = read_records(tmp.path().join(REQUEST_LOG)).unwrap();
        assert_eq!(entries[0]["latencyMs"], 40.0);
        assert_eq!(entries[0]["status"], 201);
    }

    #[tokio::test]
    async fn test_unread_body_is_logged_once_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogContext::init(tmp.path());

        let res = app(logs.requests.clone()).oneshot(get_request("/ok")).await.unwrap();
        assert!(read_records(tmp.path().join(REQUEST_LOG)).unwrap().is_empty());
        drop(res);

        let entries = read_records(tmp.path().join(REQUEST_LOG)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["outcome"], "client_disconnected");
        assert_eq!(entries[0]["status"], 200);
    }

    #[tokio::test]
    async fn test_abandoned_handler_is_logged_without_status() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = LogContext::init(tmp.path());

        let pending = app(logs.requests.clone()).oneshot(get_request("/slow"));
        let timed_out = tokio::time::timeout(Duration::from_millis(5), pending).await;
        assert!(timed_out.is_err());

        let entries = read_records(tmp.path().join(REQUEST_LOG)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["outcome"], "client_disconnected");
        assert!(entries[0].get("status").is_none());
    }

    #[tokio::test]
    async fn test_broken_log_file_does_not_affect_response() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let logs = LogContext::init(blocker.join("logs"));

        let res = app(logs.requests.clone()).oneshot(get_request("/ok")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failing_writes_do_not_affect_response() {
        // Opens fine, every write fails with ENOSPC.
        let sink = LogSink::open("/dev/full");
        assert!(sink.is_enabled());

        let res = app(sink).oneshot(get_request("/slow")).await.unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert!(res.headers().contains_key("x-request-id"));
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"done");
    }
}
