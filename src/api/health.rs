//! Health check endpoint

use super::AppState;
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub agents: usize,
    pub event_subscribers: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        agents: state.orchestrator.registry().all().count(),
        event_subscribers: state.orchestrator.events().subscriber_count(),
    })
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
