//! Per-user shopping baskets.
//!
//! # Responsibilities
//! - Identify the caller from the `x-user-id` header
//! - Add, update and remove basket items through the audited `basket` model
//! - Return baskets enriched with product name, price and image
//!
//! # Design Decisions
//! - Token verification happens upstream; this service trusts `x-user-id`
//! - Items whose product no longer exists are left out of the enriched view

use axum::{
    body::Bytes,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderName, StatusCode},
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::products::{find_product, normalise};
use crate::http::response::{parse_json_body, ApiError};
use crate::http::server::AppState;
use crate::store::query::is_truthy;

/// Header carrying the authenticated user id.
pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");

/// One stored basket line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketItem {
    pub user_id: String,
    pub product_id: Value,
    pub quantity: i64,
}

/// One line of the basket as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketLine {
    pub product_id: Value,
    pub name: Value,
    pub price: Value,
    pub image: Value,
    pub quantity: i64,
}

/// The calling user, taken from [`X_USER_ID`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(&X_USER_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| CurrentUser(v.to_string()))
            .ok_or_else(|| ApiError::Unauthorized("User identity is required".into()))
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/getbasket", post(get_basket))
        .route("/addtobasket", post(add_to_basket))
        .route("/updatequantity", post(update_quantity))
        .route("/deleteitemfrombasket", delete(delete_from_basket))
}

async fn get_basket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<BasketLine>>, ApiError> {
    Ok(Json(enriched_basket(&state, &user).await?))
}

async fn add_to_basket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body = parse_json_body(&body)?;
    let product_id = body.get("product_id").cloned().unwrap_or(Value::Null);
    if product_id.is_null() {
        return Err(ApiError::BadRequest("product_id is required".into()));
    }
    let quantity = match body.get("quantity").filter(|q| is_truthy(q)) {
        None => 1,
        Some(q) => positive_quantity(q)?,
    };

    let item = BasketItem {
        user_id: user,
        product_id,
        quantity,
    };
    state.baskets.save(&item).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Item added to basket successfully" })),
    ))
}

async fn update_quantity(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<Json<Vec<BasketLine>>, ApiError> {
    let body = parse_json_body(&body)?;
    let product_id = required_product(&body)?;
    let quantity = positive_quantity(body.get("quantity").unwrap_or(&Value::Null))?;

    let result = state
        .baskets
        .update_one(
            json!({ "user_id": user, "product_id": product_id }),
            json!({ "$set": { "quantity": quantity } }),
        )
        .await?;
    if result.modified_count == 0 {
        tracing::debug!(user = %user, "Basket quantity unchanged");
    }

    Ok(Json(enriched_basket(&state, &user).await?))
}

async fn delete_from_basket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<Json<Vec<BasketLine>>, ApiError> {
    let body = parse_json_body(&body)?;
    let product_id = required_product(&body)?;

    let result = state
        .baskets
        .remove(json!({ "user_id": user, "product_id": product_id }))
        .await?;
    tracing::debug!(user = %user, deleted = result.deleted_count, "Basket item removed");

    Ok(Json(enriched_basket(&state, &user).await?))
}

/// The user's basket joined against the product catalog.
async fn enriched_basket(state: &AppState, user: &str) -> Result<Vec<BasketLine>, ApiError> {
    let items = state.baskets.find(json!({ "user_id": user })).await?;

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let Some(product) = find_product(&state.products, &item.product_id).await? else {
            tracing::warn!(product_id = %item.product_id, "Basket references unknown product");
            continue;
        };
        let product = normalise(&product);
        lines.push(BasketLine {
            product_id: product["product_id"].clone(),
            name: product["product_name"].clone(),
            price: product["current_price"].clone(),
            image: product["link_image"].clone(),
            quantity: item.quantity,
        });
    }
    Ok(lines)
}

fn required_product(body: &Value) -> Result<&Value, ApiError> {
    body.get("productId")
        .filter(|v| !v.is_null())
        .ok_or_else(|| ApiError::BadRequest("productId is required".into()))
}

fn positive_quantity(value: &Value) -> Result<i64, ApiError> {
    value
        .as_i64()
        .filter(|q| *q > 0)
        .ok_or_else(|| ApiError::BadRequest("quantity must be a positive integer".into()))
}
