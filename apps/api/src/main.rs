//! # Tally API server
//!
//! ```text
//!   load config ──► open pool + migrate ──► bootstrap admin ──► token sweep
//!        │
//!        ▼
//!   axum::serve ──(SIGINT / SIGTERM)──► drain requests ──► close pool
//! ```

use std::time::Duration;

use anyhow::Context;
use tally_api::{bootstrap, build_router, spawn_token_sweeper, ApiConfig, AppState};
use tally_db::Database;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.log_filter);
    info!("Starting Tally API server...");

    if config.uses_dev_secret() {
        warn!("Using the development JWT secret; set TALLY_JWT_SECRET in production");
    }

    let addr = config.socket_addr()?;
    info!(
        %addr,
        schema = config.database_schema.as_deref().unwrap_or("public"),
        "Configuration loaded"
    );

    let db = Database::new(config.db_config())
        .await
        .context("Failed to open database")?;

    bootstrap::ensure_admin(&db, &config)
        .await
        .context("Failed to create bootstrap admin")?;

    let sweeper = spawn_token_sweeper(
        db.clone(),
        Duration::from_secs(config.token_sweep_interval_secs),
    );

    let state = AppState::new(db.clone(), config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    sweeper.abort();
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins over the configured filter.
fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
