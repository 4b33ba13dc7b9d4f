//! Inbox API endpoints
//!
//! GET   /api/v1/inbox          - Tasks of the calling user
//! PATCH /api/v1/inbox/:task_id - Update status, priority or tags

use super::{ApiResponse, ApiResult, AppState, CallerIdentity};
use axum::{
    extract::{Path, Query, State},
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;
use tandem_core::{InboxTask, TaskStatus, TaskUpdate};
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub status: Option<TaskStatus>,
}

async fn list_inbox(
    CallerIdentity(caller): CallerIdentity,
    State(state): State<AppState>,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Vec<InboxTask>> {
    let tasks = state.orchestrator.list_inbox(&caller, query.status).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

async fn update_task(
    CallerIdentity(caller): CallerIdentity,
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
    Json(update): Json<TaskUpdate>,
) -> ApiResult<InboxTask> {
    let task = state
        .orchestrator
        .update_task(&caller, task_id, &update)
        .await?;
    Ok(Json(ApiResponse::success(task)))
}

/// Inbox routes
pub fn inbox_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/inbox", get(list_inbox))
        .route("/api/v1/inbox/:task_id", patch(update_task))
}
