//! Catalog and basket routes, and the audit logs they produce.

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};

use discountmate_api::config::AppConfig;
use discountmate_api::observability::sink::{read_records, MODEL_LOG, QUERY_LOG};
use discountmate_api::observability::LogContext;
use discountmate_api::store::{Collection, Database, MemoryDatabase};
use discountmate_api::HttpServer;

mod common;

async fn seeded(db: &MemoryDatabase) {
    let products = db.collection("products");
    for doc in [
        json!({"_id": "0123456789abcdef01234567", "product_code": 1001, "item_name": "Milk 2L", "best_price": 3.2, "link": "https://shop/milk"}),
        json!({"product_code": "B-7", "product_name": "Sourdough", "price": 5.5, "image": "https://img/bread.png"}),
    ] {
        products.insert_one(doc).await.unwrap();
    }
}

fn user_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    let mut request = common::json_request(method, uri, body);
    request
        .headers_mut()
        .insert("x-user-id", "user-1".parse().unwrap());
    request
}

#[tokio::test]
async fn test_empty_catalog_is_404() {
    let server = HttpServer::new(AppConfig::default(), LogContext::disabled());
    let res = common::send(&server.router(), Request::get("/api/products").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(common::body_json(res).await, json!({"message": "No products found"}));
}

#[tokio::test]
async fn test_products_are_normalised() {
    let db = MemoryDatabase::new();
    seeded(&db).await;
    let server = HttpServer::with_database(AppConfig::default(), LogContext::disabled(), db);

    let res = common::send(&server.router(), Request::get("/api/products").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let products = common::body_json(res).await;
    let products = products.as_array().unwrap();
    assert_eq!(products.len(), 2);

    let milk = products.iter().find(|p| p["product_id"] == 1001).unwrap();
    assert_eq!(milk["product_name"], "Milk 2L");
    assert_eq!(milk["current_price"], 3.2);
    assert_eq!(milk["link_image"], "https://shop/milk");
}

#[tokio::test]
async fn test_get_product_lookups() {
    let db = MemoryDatabase::new();
    seeded(&db).await;
    let router = HttpServer::with_database(AppConfig::default(), LogContext::disabled(), db).router();

    let cases = [
        (json!({"productId": "0123456789abcdef01234567"}), StatusCode::OK),
        (json!({"product_id": "1001"}), StatusCode::OK),
        (json!({"productId": "B-7"}), StatusCode::OK),
        (json!({"productId": "missing"}), StatusCode::NOT_FOUND),
        (json!({}), StatusCode::BAD_REQUEST),
    ];
    for (body, expected) in cases {
        let res = common::send(&router, common::json_request("POST", "/api/products/getproduct", body.clone())).await;
        assert_eq!(res.status(), expected, "body {}", body);
        common::body_bytes(res).await;
    }
}

#[tokio::test]
async fn test_basket_flow() {
    let db = MemoryDatabase::new();
    seeded(&db).await;
    let router = HttpServer::with_database(AppConfig::default(), LogContext::disabled(), db).router();

    let res = common::send(&router, common::json_request("POST", "/api/baskets/getbasket", json!({}))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    common::body_bytes(res).await;

    let res = common::send(&router, user_request("POST", "/api/baskets/addtobasket", json!({"product_id": 1001}))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(
        common::body_json(res).await,
        json!({"message": "Item added to basket successfully"})
    );

    let res = common::send(&router, user_request("POST", "/api/baskets/addtobasket", json!({"product_id": "B-7", "quantity": 2}))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    common::body_bytes(res).await;

    let res = common::send(&router, user_request("POST", "/api/baskets/updatequantity", json!({"productId": 1001, "quantity": 4}))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let basket = common::body_json(res).await;
    let milk = basket.as_array().unwrap().iter().find(|l| l["productId"] == 1001).unwrap();
    assert_eq!(milk["quantity"], 4);
    assert_eq!(milk["name"], "Milk 2L");
    assert_eq!(milk["price"], 3.2);

    let res = common::send(&router, user_request("DELETE", "/api/baskets/deleteitemfrombasket", json!({"productId": 1001}))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let basket = common::body_json(res).await;
    assert_eq!(
        basket,
        json!([{"productId": "B-7", "name": "Sourdough", "price": 5.5, "image": "https://img/bread.png", "quantity": 2}])
    );
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_calls_reach_audit_logs() {
    let dir = tempfile::tempdir().unwrap();
    let db = MemoryDatabase::with_latency(Duration::from_millis(150));
    seeded(&db).await;
    let router = HttpServer::with_database(AppConfig::default(), LogContext::init(dir.path()), db).router();

    let res = common::send(&router, Request::get("/api/products").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    common::body_bytes(res).await;

    let res = common::send(&router, user_request("POST", "/api/baskets/getbasket", json!({}))).await;
    assert_eq!(res.status(), StatusCode::OK);
    common::body_bytes(res).await;

    let queries = read_records(dir.path().join(QUERY_LOG)).unwrap();
    let product_scan = queries
        .iter()
        .find(|r| r["collection"] == "products" && r["method"] == "find")
        .unwrap();
    assert_eq!(product_scan["durationMs"], 150.0);
    assert_eq!(product_scan["outcome"], "ok");
    assert!(queries.iter().any(|r| r["collection"] == "basket" && r["method"] == "find"));

    let models = read_records(dir.path().join(MODEL_LOG)).unwrap();
    assert_eq!(models.len(), 1);
    assert_eq!(models[0]["model"], "basket");
    assert_eq!(models[0]["hook"], "find");
    assert_eq!(models[0]["durationMs"], 150.0);
}

#[tokio::test(start_paused = true)]
async fn test_fast_store_calls_are_not_audited() {
    let dir = tempfile::tempdir().unwrap();
    let db = MemoryDatabase::with_latency(Duration::from_millis(100));
    seeded(&db).await;
    let router = HttpServer::with_database(AppConfig::default(), LogContext::init(dir.path()), db).router();

    let res = common::send(&router, Request::get("/api/products").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    common::body_bytes(res).await;

    assert!(read_records(dir.path().join(QUERY_LOG)).unwrap().is_empty());
}

#[tokio::test]
async fn test_blog_and_news_feeds() {
    let router = HttpServer::new(AppConfig::default(), LogContext::disabled()).router();

    for (heading, date) in [("Older", "2024-01-02"), ("Newest", "2024-03-09"), ("Middle", "2024-02-15")] {
        let body = json!({"heading": heading, "description": "d", "date": date, "user": "ana"});
        let res = common::send(&router, common::json_request("POST", "/api/blogs/submit-blog", body)).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let reply = common::body_json(res).await;
        assert_eq!(reply["message"], "Blog data received and saved successfully");
        assert_eq!(reply["blogId"].as_str().unwrap().len(), 24);
    }

    let res = common::send(&router, Request::get("/api/blogs").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    let blogs = common::body_json(res).await;
    let headings: Vec<&str> = blogs.as_array().unwrap().iter().map(|b| b["heading"].as_str().unwrap()).collect();
    assert_eq!(headings, ["Newest", "Middle", "Older"]);
    assert!(blogs[0]["created_at"].is_string());
    assert!(blogs[0]["_id"].is_string());

    // news is a separate collection
    let res = common::send(&router, Request::get("/api/news").body(Body::empty()).unwrap()).await;
    assert_eq!(common::body_json(res).await, json!([]));

    let res = common::send(&router, common::json_request("POST", "/api/news/submit-news", json!({"heading": "Store opening"}))).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let reply = common::body_json(res).await;
    assert_eq!(reply["message"], "News data received and saved successfully");
    assert!(reply["newsId"].is_string());
    assert!(reply.get("blogId").is_none());

    let res = common::send(&router, Request::get("/api/news").body(Body::empty()).unwrap()).await;
    let news = common::body_json(res).await;
    assert_eq!(news.as_array().unwrap().len(), 1);
    assert_eq!(news[0]["heading"], "Store opening");
    assert!(news[0].get("description").is_none());
}

#[tokio::test]
async fn test_feed_submission_rejects_malformed_json() {
    let router = HttpServer::new(AppConfig::default(), LogContext::disabled()).router();
    let request = Request::post("/api/news/submit-news")
        .header("content-type", "application/json")
        .body(Body::from("{oops"))
        .unwrap();
    let res = common::send(&router, request).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    common::body_bytes(res).await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_feed_listing_is_audited_as_aggregate() {
    let dir = tempfile::tempdir().unwrap();
    let db = MemoryDatabase::with_latency(Duration::from_millis(120));
    db.collection("news")
        .insert_one(json!({"heading": "Store opening", "date": "2024-03-01"}))
        .await
        .unwrap();
    let router = HttpServer::with_database(AppConfig::default(), LogContext::init(dir.path()), db).router();

    let res = common::send(&router, Request::get("/api/news").body(Body::empty()).unwrap()).await;
    assert_eq!(res.status(), StatusCode::OK);
    common::body_bytes(res).await;

    let queries = read_records(dir.path().join(QUERY_LOG)).unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["collection"], "news");
    assert_eq!(queries[0]["method"], "aggregate");
    assert_eq!(queries[0]["durationMs"], 120.0);
}
