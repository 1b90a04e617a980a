//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): latency by method
//! - `store_slow_operations_total` (counter): slow data access by layer, operation
//! - `proxy_downstream_failures_total` (counter): failed proxy calls by service, kind
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    let builder = match builder.set_buckets_for_metric(
        Matcher::Full("http_request_duration_seconds".to_string()),
        &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
    ) {
        Ok(b) => b,
        Err(e) => {
            tracing::error!(error = %e, "Invalid histogram buckets");
            return;
        }
    };

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, latency_ms: f64) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(latency_ms / 1000.0);
}

pub fn record_slow_operation(layer: &'static str, operation: &'static str) {
    counter!(
        "store_slow_operations_total",
        "layer" => layer,
        "operation" => operation
    )
    .increment(1);
}

pub fn record_downstream_failure(service: &'static str, kind: &'static str) {
    counter!(
        "proxy_downstream_failures_total",
        "service" => service,
        "kind" => kind
    )
    .increment(1);
}
