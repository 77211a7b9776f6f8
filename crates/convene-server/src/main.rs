//! # convene-server
//!
//! HTTP API for the Convene event platform.
//!
//! This binary provides:
//! - **REST API** (axum) over the conversation engine, message ledger,
//!   review ledger, users and event catalog
//! - **SQLite storage** at `DATABASE_PATH` or the platform data directory
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod config;
mod error;
mod rate_limit;

use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use convene_core::Engine;
use convene_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,convene_server=debug,convene_core=debug,convene_store=info")
        }))
        .init();

    info!("Starting Convene server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the database and build the engine
    // -----------------------------------------------------------------------
    let db = match &config.database_path {
        Some(path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    if let Some(path) = db.path() {
        info!(path = %path.display(), "Database ready");
    }
    let engine = Engine::new(db, config.policy());
    info!(
        instance = %config.instance_name,
        capacity_policy = ?config.capacity_policy,
        review_requires_confirmation = config.review_requires_confirmation,
        "Engine policy"
    );

    let http_addr = config.http_addr;
    let app_state = AppState::new(engine, config);

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Every 5 minutes, forget clients idle for more than 10 minutes
    let limiter = app_state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.evict_idle(Duration::from_secs(600)).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
