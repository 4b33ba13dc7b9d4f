//! Rooms API endpoints
//!
//! POST /api/v1/rooms         - Create a room
//! GET  /api/v1/rooms/:id     - Room with its full ledger
//! POST /api/v1/rooms/:id/ask - Send a human message through the agents

use super::{ApiResponse, ApiResult, AppState, CallerIdentity};
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tandem_core::{AskMode, AskRequest, Error, RoomView};

/// Request to create a room
#[derive(Debug, Default, Deserialize)]
pub struct CreateRoomRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Created room
#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
    pub room_name: String,
}

/// Human message submitted to a room
#[derive(Debug, Deserialize)]
pub struct AskBody {
    /// Defaults to the `x-user-id` header
    #[serde(default)]
    pub user_id: Option<String>,
    /// Defaults to the user id
    #[serde(default)]
    pub user_name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub mode: AskMode,
    #[serde(default)]
    pub target_agent: Option<String>,
}

async fn create_room(
    CallerIdentity(caller): CallerIdentity,
    State(state): State<AppState>,
    Json(request): Json<CreateRoomRequest>,
) -> ApiResult<CreateRoomResponse> {
    let name = request.name.unwrap_or_default();
    let room = state.orchestrator.create_room(&caller, &name).await?;
    Ok(Json(ApiResponse::success(CreateRoomResponse {
        room_id: room.id,
        room_name: room.name,
    })))
}

async fn get_room(
    CallerIdentity(caller): CallerIdentity,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> ApiResult<RoomView> {
    let view = state.orchestrator.get_room(&caller, &room_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

async fn ask(
    CallerIdentity(caller): CallerIdentity,
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(body): Json<AskBody>,
) -> ApiResult<RoomView> {
    // The body id only attributes the message; rate limiting stays keyed on
    // the header identity or the peer address.
    let user_id = caller
        .user_id
        .clone()
        .or_else(|| body.user_id.filter(|u| !u.trim().is_empty()))
        .ok_or_else(|| Error::Forbidden("user identity required".to_string()))?;

    let user_name = body
        .user_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| user_id.clone());

    let mut request = AskRequest::new(user_id, user_name, body.content, body.mode);
    request.target_agent = body.target_agent;

    let view = state.orchestrator.ask(&caller, &room_id, request).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// Rooms routes
pub fn rooms_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/rooms", post(create_room))
        .route("/api/v1/rooms/:id", get(get_room))
        .route("/api/v1/rooms/:id/ask", post(ask))
}
