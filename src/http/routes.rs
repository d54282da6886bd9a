//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::store::ScoreRecord;
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let allowed_origins: Vec<HeaderValue> = state
        .config
        .client_origins
        .iter()
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    let cors = if allowed_origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(allowed_origins)
    };

    Router::new()
        .route("/health", get(health_handler))
        .route("/statistics", get(statistics_handler))
        .route("/ws", get(ws_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_players: usize,
    waiting_players: usize,
    round_in_progress: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.game.status();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_players: status.active_players,
        waiting_players: status.waiting_players,
        round_in_progress: status.round_in_progress,
    })
}

// ============================================================================
// Statistics endpoint
// ============================================================================

async fn statistics_handler(State(state): State<AppState>) -> Json<Vec<ScoreRecord>> {
    Json(state.game.statistics())
}
