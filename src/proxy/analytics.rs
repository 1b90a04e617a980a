//! Analytics service routes.

use std::time::Duration;

use axum::{body::Bytes, extract::State, response::Response, routing::post, Router};

use super::{forward_body, Endpoint, CONNECTION_FAILED};
use crate::http::response::ApiError;
use crate::http::server::AppState;

const REPORT_TIMEOUT: Duration = Duration::from_secs(30);

pub const SALES_SUMMARY: Endpoint = Endpoint {
    path: "/api/analytics/sales-summary",
    timeout: REPORT_TIMEOUT,
    action: "get sales summary",
    unreachable: "Service connection failed. Please ensure the Python Analytics service is running on port 5002.",
};

pub const BRAND_ANALYSIS: Endpoint = Endpoint {
    path: "/api/analytics/brand-analysis",
    timeout: REPORT_TIMEOUT,
    action: "get brand analysis",
    unreachable: CONNECTION_FAILED,
};

pub const PRICE_COMPARISON: Endpoint = Endpoint {
    path: "/api/analytics/price-comparison",
    timeout: REPORT_TIMEOUT,
    action: "get price comparison",
    unreachable: CONNECTION_FAILED,
};

pub const DATA_CLEANING: Endpoint = Endpoint {
    path: "/api/analytics/data-cleaning",
    timeout: Duration::from_secs(60),
    action: "clean data",
    unreachable: CONNECTION_FAILED,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales-summary", post(sales_summary))
        .route("/brand-analysis", post(brand_analysis))
        .route("/price-comparison", post(price_comparison))
        .route("/data-cleaning", post(data_cleaning))
}

async fn sales_summary(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    forward_body(&state.analytics, &SALES_SUMMARY, body).await
}

async fn brand_analysis(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    forward_body(&state.analytics, &BRAND_ANALYSIS, body).await
}

async fn price_comparison(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    forward_body(&state.analytics, &PRICE_COMPARISON, body).await
}

async fn data_cleaning(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    forward_body(&state.analytics, &DATA_CLEANING, body).await
}
