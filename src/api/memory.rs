//! Memory API endpoints
//!
//! GET  /api/v1/rooms/:id/memory       - Memory summary, recent notes, count
//! POST /api/v1/rooms/:id/memory/query - Ask the project memory a question

use super::{ApiResponse, ApiResult, AppState, CallerIdentity};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tandem_core::{MemoryAnswer, MemoryView};

/// Question for the project memory
#[derive(Debug, Deserialize)]
pub struct MemoryQueryRequest {
    pub question: String,
    /// Name used in the prompt; defaults to the caller's user id
    #[serde(default)]
    pub asker: Option<String>,
}

async fn get_memory(
    CallerIdentity(caller): CallerIdentity,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<MemoryView> {
    let view = state.orchestrator.get_memory(&caller, &room_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

async fn query_memory(
    CallerIdentity(caller): CallerIdentity,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<MemoryQueryRequest>,
) -> ApiResult<MemoryAnswer> {
    let asker = request
        .asker
        .filter(|a| !a.trim().is_empty())
        .or_else(|| caller.user_id.clone())
        .unwrap_or_else(|| "Someone".to_string());

    let answer = state
        .orchestrator
        .query_memory(&caller, &room_id, &asker, &request.question)
        .await?;
    Ok(Json(ApiResponse::success(answer)))
}

/// Memory routes
pub fn memory_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/rooms/:id/memory", get(get_memory))
        .route("/api/v1/rooms/:id/memory/query", post(query_memory))
}
