//! Blog posts and news articles.
//!
//! # Responsibilities
//! - List a feed newest first (by `date`)
//! - Store a submitted post with a server-side `created_at`
//!
//! # Design Decisions
//! - Blogs and news differ only in collection and wording, so one set of
//!   handlers serves both through a [`Feed`] descriptor
//! - Listing is an aggregate cursor, so a slow scan is timed when it is
//!   materialized and lands in `db_queries.log`
//! - Submitted fields are stored as given; absent fields are left out

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};

use crate::http::response::{parse_json_body, ApiError};
use crate::http::server::{AppState, StoreCollection};
use crate::observability::sink::timestamp;
use crate::store::{Collection, Cursor};

/// Fields copied from a submission into the stored document.
const SUBMITTED_FIELDS: [&str; 4] = ["heading", "description", "date", "user"];

/// One document feed and the wording of its responses.
pub struct Feed {
    /// Route under the feed prefix that accepts submissions.
    pub submit_path: &'static str,
    /// Key carrying the inserted id in the 201 response.
    pub id_field: &'static str,
    /// Message returned with a successful submission.
    pub saved: &'static str,
    /// Message returned when listing fails.
    pub fetch_failed: &'static str,
    collection: fn(&AppState) -> &StoreCollection,
}

pub static BLOGS: Feed = Feed {
    submit_path: "/submit-blog",
    id_field: "blogId",
    saved: "Blog data received and saved successfully",
    fetch_failed: "Error fetching blogs",
    collection: blogs,
};

pub static NEWS: Feed = Feed {
    submit_path: "/submit-news",
    id_field: "newsId",
    saved: "News data received and saved successfully",
    fetch_failed: "Error fetching news",
    collection: news,
};

fn blogs(state: &AppState) -> &StoreCollection {
    &state.blogs
}

fn news(state: &AppState) -> &StoreCollection {
    &state.news
}

pub fn routes(feed: &'static Feed) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(move |State(state): State<AppState>| async move { list_posts(&state, feed).await }),
        )
        .route(
            feed.submit_path,
            post(move |State(state): State<AppState>, body: Bytes| async move {
                submit_post(&state, feed, body).await
            }),
        )
}

async fn list_posts(state: &AppState, feed: &Feed) -> Result<Json<Vec<Value>>, ApiError> {
    let collection = (feed.collection)(state);
    let posts = collection
        .aggregate(vec![json!({ "$sort": { "date": -1 } })])
        .to_vec()
        .await
        .map_err(|e| {
            tracing::error!(collection = collection.name(), error = %e, "Feed listing failed");
            ApiError::Internal(feed.fetch_failed.to_string())
        })?;
    Ok(Json(posts))
}

async fn submit_post(state: &AppState, feed: &Feed, body: Bytes) -> Result<impl IntoResponse, ApiError> {
    let body = parse_json_body(&body)?;
    let result = (feed.collection)(state).insert_one(post_document(&body)).await?;

    let mut response = Map::new();
    response.insert("message".into(), Value::from(feed.saved));
    response.insert(feed.id_field.into(), result.inserted_id);
    Ok((StatusCode::CREATED, Json(Value::Object(response))))
}

/// The stored form of a submission.
pub fn post_document(body: &Value) -> Value {
    let mut doc: Map<String, Value> = SUBMITTED_FIELDS
        .iter()
        .filter_map(|key| body.get(*key).map(|v| (key.to_string(), v.clone())))
        .collect();
    doc.insert("created_at".into(), Value::from(timestamp()));
    Value::Object(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_document_keeps_known_fields() {
        let doc = post_document(&json!({
            "heading": "Half price milk",
            "date": "2024-05-01",
            "user": "ana",
            "_id": "forced",
            "extra": 1,
        }));
        assert_eq!(doc["heading"], "Half price milk");
        assert_eq!(doc["date"], "2024-05-01");
        assert_eq!(doc["user"], "ana");
        assert!(doc.get("description").is_none());
        assert!(doc.get("_id").is_none());
        assert!(doc.get("extra").is_none());
        assert!(doc["created_at"].as_str().is_some_and(|t| t.ends_with('Z')));
    }

    #[test]
    fn test_feeds_use_distinct_wording() {
        assert_eq!(BLOGS.id_field, "blogId");
        assert_eq!(NEWS.id_field, "newsId");
        assert_ne!(BLOGS.submit_path, NEWS.submit_path);
    }
}
