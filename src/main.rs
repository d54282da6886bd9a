//! Tough Cannons Server - authoritative server for a two-player artillery duel
//!
//! This is the main entry point for the game server. It handles:
//! - WebSocket connections for the duel and its waiting queue
//! - Round generation, shot resolution, and turn sequencing
//! - Persistent score statistics
//! - Health and statistics HTTP endpoints

mod app;
mod config;
mod game;
mod http;
mod matchmaking;
mod store;
mod util;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::AppState;
use crate::config::Config;
use crate::http::build_router;
use crate::store::{JsonFileStore, ScoreStore, SnapshotWriter};
use crate::util::time::init_server_time;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize server time tracking
    init_server_time();

    info!("Starting Tough Cannons Server");
    info!("Server address: {}", config.server_addr);

    // A score file that does not validate is fatal: there is no safe default
    let store: Arc<dyn ScoreStore> = Arc::new(JsonFileStore::new(config.stats_path.clone()));
    let records = store
        .load()
        .with_context(|| format!("loading scores from {}", config.stats_path.display()))?;

    let (writer, writer_handle) = SnapshotWriter::spawn(store.clone());

    // Create application state
    let state = AppState::new(config.clone(), records, writer.clone());

    // Spawn liveness sweep
    let liveness = tokio::spawn(state.game.clone().run_liveness());

    let game = state.game.clone();

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    liveness.abort();

    // The writer owns the score file; queue the final table behind any
    // snapshot already in flight and wait for it to land
    writer.submit(game.statistics());
    writer.shutdown();
    if let Err(e) = writer_handle.await {
        error!(error = %e, "Score writer failed during shutdown");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
