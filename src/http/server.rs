//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with every API route
//! - Wire up middleware (access log, CORS, body limit)
//! - Build the shared handler state (audited store handles, service clients)
//! - Serve on a listener until shutdown is signalled
//!
//! # Design Decisions
//! - The access log is the outermost layer, so rejected and unmatched
//!   requests are logged too
//! - Products, blogs and news use the driver-level audited collection;
//!   baskets add the schema-level model on top of it

use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::audit::{AuditedCollection, AuditedDatabase, ModelAuditor, QueryAuditor, SlowPolicy};
use crate::catalog::{self, BasketItem};
use crate::config::AppConfig;
use crate::http::access_log::access_log_middleware;
use crate::observability::LogContext;
use crate::proxy::{self, ServiceClient};
use crate::store::{Database, MemoryCollection, MemoryDatabase, Model};

/// Collection handle used by the handlers.
pub type StoreCollection = AuditedCollection<MemoryCollection>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub products: StoreCollection,
    pub baskets: Model<BasketItem, StoreCollection>,
    pub blogs: StoreCollection,
    pub news: StoreCollection,
    pub ml: ServiceClient,
    pub analytics: ServiceClient,
}

impl AppState {
    pub fn new(config: &AppConfig, logs: &LogContext, db: MemoryDatabase) -> Self {
        let policy = SlowPolicy::new(config.audit.slow_threshold_ms);
        let db = AuditedDatabase::new(db, QueryAuditor::new(logs.queries.clone(), policy));
        let models = ModelAuditor::new(logs.models.clone(), policy);

        Self {
            products: db.collection(&config.catalog.products_collection),
            baskets: Model::new(db.collection(&config.catalog.baskets_collection), models),
            blogs: db.collection(&config.catalog.blogs_collection),
            news: db.collection(&config.catalog.news_collection),
            ml: ServiceClient::new("ML", config.services.ml_url.clone()),
            analytics: ServiceClient::new("Analytics", config.services.analytics_url.clone()),
        }
    }
}

/// HTTP server for the API.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a server over an empty in-memory store.
    pub fn new(config: AppConfig, logs: LogContext) -> Self {
        Self::with_database(config, logs, MemoryDatabase::new())
    }

    /// Create a server over an existing store.
    pub fn with_database(config: AppConfig, logs: LogContext, db: MemoryDatabase) -> Self {
        let state = AppState::new(&config, &logs, db);
        let router = Self::build_router(&config, &logs, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &AppConfig, logs: &LogContext, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/", get(welcome))
            .route("/health", get(health))
            .merge(catalog::routes())
            .merge(proxy::routes())
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.security.max_body_size));

        if config.security.cors_allow_any {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                    .allow_headers(Any),
            );
        }

        router.layer(middleware::from_fn_with_state(
            logs.requests.clone(),
            access_log_middleware,
        ))
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            ml = %self.config.services.ml_url,
            analytics = %self.config.services.analytics_url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

async fn welcome() -> &'static str {
    "Welcome to the DiscountMate API!"
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
