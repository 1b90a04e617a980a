//! Product lookup and normalisation.
//!
//! # Responsibilities
//! - List every product in the catalog
//! - Resolve a product from the loosely-typed identifiers clients send
//! - Map heterogeneous product documents onto one response shape
//!
//! # Design Decisions
//! - Lookups go through the driver-level audited collection, so slow scans
//!   land in `db_queries.log`
//! - A missing field and an explicit `null` are treated the same when
//!   picking fallbacks

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Number, Value};

use crate::http::response::{parse_json_body, ApiError};
use crate::http::server::AppState;
use crate::store::query::is_truthy;
use crate::store::{Collection, Cursor, Document, StoreResult};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/getproduct", post(get_product))
}

async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Value>>, ApiError> {
    let products = state.products.find(json!({})).to_vec().await?;
    if products.is_empty() {
        return Err(ApiError::NotFound("No products found".into()));
    }
    Ok(Json(products.iter().map(normalise).collect()))
}

async fn get_product(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let body = parse_json_body(&body)?;
    let identifier = product_identifier(&body)
        .ok_or_else(|| ApiError::BadRequest("Product identifier is required".into()))?;

    match find_product(&state.products, identifier).await? {
        Some(product) => Ok(Json(normalise(&product))),
        None => Err(ApiError::NotFound("Product not found".into())),
    }
}

/// `productId`, else `product_id`; falsy identifiers count as absent.
pub fn product_identifier(body: &Value) -> Option<&Value> {
    present(body, "productId")
        .or_else(|| present(body, "product_id"))
        .filter(|id| is_truthy(id))
}

/// Resolve by `_id` (24 hex chars), then by `product_code` as given, then by
/// `product_code` as a number.
pub async fn find_product<C: Collection>(products: &C, identifier: &Value) -> StoreResult<Option<Document>> {
    if let Some(id) = identifier.as_str().filter(|s| is_object_id(s)) {
        if let Some(found) = products.find_one(json!({ "_id": id })).await? {
            return Ok(Some(found));
        }
    }

    if let Some(found) = products.find_one(json!({ "product_code": identifier })).await? {
        return Ok(Some(found));
    }

    match numeric_code(identifier) {
        Some(code) => products.find_one(json!({ "product_code": code })).await,
        None => Ok(None),
    }
}

/// Project a stored product onto the fields clients render.
pub fn normalise(product: &Document) -> Value {
    let first = |keys: &[&str]| keys.iter().find_map(|key| present(product, key)).cloned();
    let field = |key: &str| present(product, key).cloned().unwrap_or(Value::Null);

    let mut out = Map::new();
    out.insert("_id".into(), field("_id"));
    out.insert(
        "product_id".into(),
        first(&["product_id", "productId", "product_code"]).unwrap_or(Value::Null),
    );
    out.insert(
        "product_name".into(),
        first(&["product_name", "name", "item_name"]).unwrap_or_else(|| Value::from("Unnamed Product")),
    );
    out.insert(
        "link_image".into(),
        first(&["link_image", "image", "link"]).unwrap_or(Value::Null),
    );
    out.insert(
        "current_price".into(),
        first(&["best_price", "item_price", "current_price", "price"]).unwrap_or_else(|| Value::from(0)),
    );
    for key in ["category", "best_price", "best_unit_price", "item_price", "unit_price", "link"] {
        out.insert(key.into(), field(key));
    }
    Value::Object(out)
}

fn present<'a>(doc: &'a Value, key: &str) -> Option<&'a Value> {
    doc.get(key).filter(|v| !v.is_null())
}

fn is_object_id(s: &str) -> bool {
    s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Numeric reading of an identifier: numbers as-is, strings parsed after
/// trimming (blank reads as 0).
fn numeric_code(identifier: &Value) -> Option<Value> {
    let n = match identifier {
        Value::Number(n) => return Some(Value::Number(n.clone())),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}
