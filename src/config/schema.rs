//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the API server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Logging, log files and metrics.
    pub observability: ObservabilityConfig,

    /// Data-access auditing settings.
    pub audit: AuditConfig,

    /// Downstream ML and analytics services.
    pub services: ServicesConfig,

    /// Product, basket, blog and news storage.
    pub catalog: CatalogConfig,

    /// Request limits and CORS.
    pub security: SecurityConfig,
}

impl AppConfig {
    /// Apply environment overrides (`ML_SERVICE_URL`, `ANALYTICS_SERVICE_URL`, `PORT`).
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ML_SERVICE_URL").filter(|v| !v.is_empty()) {
            self.services.ml_url = url;
        }
        if let Some(url) = lookup("ANALYTICS_SERVICE_URL").filter(|v| !v.is_empty()) {
            self.services.analytics_url = url;
        }
        if let Some(port) = lookup("PORT").and_then(|v| v.parse::<u16>().ok()) {
            let host = self
                .listener
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.listener.bind_address = format!("{}:{}", host, port);
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Console output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Console format.
    pub log_format: LogFormat,

    /// Directory holding the NDJSON log files.
    pub log_dir: String,

    /// Write request and audit records to `log_dir`.
    pub file_logging: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            log_dir: "logs".to_string(),
            file_logging: true,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Data-access auditing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Operations strictly slower than this are reported.
    pub slow_threshold_ms: f64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: 100.0,
        }
    }
}

/// Downstream service base URLs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// ML service (weekly specials, recommendations, price prediction).
    pub ml_url: String,

    /// Analytics service (sales, brands, price comparison, data cleaning).
    pub analytics_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            ml_url: "http://localhost:5001".to_string(),
            analytics_url: "http://localhost:5002".to_string(),
        }
    }
}

/// Catalog storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Optional JSON array of product documents loaded at startup.
    pub seed_path: Option<String>,

    /// Collection holding product documents.
    pub products_collection: String,

    /// Collection holding basket items.
    pub baskets_collection: String,

    /// Collection holding blog posts.
    pub blogs_collection: String,

    /// Collection holding news articles.
    pub news_collection: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            seed_path: None,
            products_collection: "products".to_string(),
            baskets_collection: "basket".to_string(),
            blogs_collection: "blogs".to_string(),
            news_collection: "news".to_string(),
        }
    }
}

/// Request hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
    /// Allow any origin (GET, POST, PUT, DELETE).
    pub cors_allow_any: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            cors_allow_any: true,
        }
    }
}
