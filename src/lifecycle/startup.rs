//! Startup orchestration.
//!
//! # Responsibilities
//! - Prepare the log directory and sinks
//! - Load seed product data
//! - Bind the listener
//!
//! # Design Decisions
//! - Fail fast: a bad seed file or an unbindable address is fatal
//! - The listener binds last (traffic only when ready)
//! - Seed documents are inserted below the auditors, so startup does not
//!   fill the query log

use std::path::Path;

use tokio::net::TcpListener;

use crate::catalog::{load_seed, SeedError};
use crate::config::AppConfig;
use crate::http::HttpServer;
use crate::observability::LogContext;
use crate::store::{Database, MemoryDatabase};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build the server: log sinks, store, seed data.
pub async fn build_server(config: AppConfig) -> Result<HttpServer, StartupError> {
    let logs = LogContext::from_config(&config.observability);
    let db = MemoryDatabase::new();

    if let Some(path) = &config.catalog.seed_path {
        let products = db.collection(&config.catalog.products_collection);
        load_seed(&products, Path::new(path)).await?;
    }

    Ok(HttpServer::with_database(config, logs, db))
}

/// Bind the configured listener address.
pub async fn bind(config: &AppConfig) -> Result<TcpListener, StartupError> {
    let address = config.listener.bind_address.clone();
    TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })
}
