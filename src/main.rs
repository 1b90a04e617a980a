//! DiscountMate API server.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ access log ──▶ CORS / body limit ──▶ handlers
//!                  │                                  │
//!                  ▼                                  ├─▶ catalog ──▶ Model (schema audit)
//!              api.log                                │                 └─▶ AuditedCollection (driver audit)
//!                                                     │                        ├─▶ model_operations.log
//!                                                     │                        └─▶ db_queries.log
//!                                                     └─▶ proxy ──▶ ML / analytics services
//! ```

use std::path::PathBuf;

use clap::Parser;

use discountmate_api::config::load_or_default;
use discountmate_api::lifecycle::{self, Shutdown};
use discountmate_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "discountmate-api")]
#[command(about = "DiscountMate API server", long_about = None)]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long, env = "DISCOUNTMATE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Missing .env is fine.
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let config = load_or_default(args.config.as_deref())?;
    logging::init_tracing(&config.observability)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "discountmate-api starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        log_dir = %config.observability.log_dir,
        slow_threshold_ms = config.audit.slow_threshold_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = lifecycle::bind(&config).await?;
    let server = lifecycle::build_server(config).await?;

    let shutdown = Shutdown::new();
    lifecycle::spawn_signal_listener(&shutdown);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
