//! DiscountMate API library.
//!
//! Request logging, data-access auditing and proxying to the ML and
//! analytics services, behind an Axum HTTP server.

pub mod audit;
pub mod catalog;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod store;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::LogContext;
