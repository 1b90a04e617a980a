//! ML service routes: weekly specials, recommendations, price prediction.

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, State},
    response::Response,
    routing::{get, post},
    Router,
};

use super::{forward_body, Endpoint, CONNECTION_FAILED};
use crate::http::response::ApiError;
use crate::http::server::AppState;

pub const WEEKLY_SPECIALS: Endpoint = Endpoint {
    path: "/api/weekly-specials",
    timeout: Duration::from_secs(10),
    action: "fetch weekly specials",
    unreachable: "Service connection failed. Please ensure the Python ML service is running on port 5001.",
};

pub const RECOMMENDATIONS: Endpoint = Endpoint {
    path: "/api/ml/recommendations",
    timeout: Duration::from_secs(15),
    action: "get recommendations",
    unreachable: CONNECTION_FAILED,
};

pub const PRICE_PREDICTION: Endpoint = Endpoint {
    path: "/api/ml/price-prediction",
    timeout: Duration::from_secs(15),
    action: "get price prediction",
    unreachable: CONNECTION_FAILED,
};

/// Query parameters the weekly-specials endpoint understands.
const WEEKLY_SPECIALS_PARAMS: [&str; 2] = ["limit", "category"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/weekly-specials", get(weekly_specials))
        .route("/recommendations", post(recommendations))
        .route("/price-prediction", post(price_prediction))
}

async fn weekly_specials(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let params = known_params(&query, &WEEKLY_SPECIALS_PARAMS);
    Ok(state.ml.get(&WEEKLY_SPECIALS, &params).await?)
}

async fn recommendations(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    forward_body(&state.ml, &RECOMMENDATIONS, body).await
}

async fn price_prediction(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    forward_body(&state.ml, &PRICE_PREDICTION, body).await
}

/// Keep only `allowed` keys with a non-empty value, in `allowed` order.
fn known_params<'a>(query: &HashMap<String, String>, allowed: &[&'a str]) -> Vec<(&'a str, String)> {
    allowed
        .iter()
        .filter_map(|key| {
            query
                .get(*key)
                .filter(|value| !value.is_empty())
                .map(|value| (*key, value.clone()))
        })
        .collect()
}
