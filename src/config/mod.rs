//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → AppConfig::apply_env (ML_SERVICE_URL, ANALYTICS_SERVICE_URL, PORT)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → cloned into each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::{
    AppConfig, AuditConfig, CatalogConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    SecurityConfig, ServicesConfig,
};
pub use validation::ValidationError;
