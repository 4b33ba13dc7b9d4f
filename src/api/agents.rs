//! Agents API endpoints
//!
//! GET   /api/v1/agents             - Roster
//! GET   /api/v1/agents/:id/persona - Persona of one agent
//! PATCH /api/v1/agents/:id/persona - Merge persona attributes

use super::{ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use tandem_core::{AgentInfo, AgentPersona};

/// Attributes to merge into a persona
#[derive(Debug, Deserialize)]
pub struct PersonaEdit {
    pub attributes: BTreeMap<String, String>,
}

async fn list_agents(State(state): State<AppState>) -> Json<ApiResponse<Vec<AgentInfo>>> {
    Json(ApiResponse::success(state.orchestrator.agents()))
}

async fn get_persona(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> ApiResult<AgentPersona> {
    let persona = state.orchestrator.get_persona(&agent_id).await?;
    Ok(Json(ApiResponse::success(persona)))
}

async fn edit_persona(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(edit): Json<PersonaEdit>,
) -> ApiResult<AgentPersona> {
    let attributes: Vec<(String, String)> = edit.attributes.into_iter().collect();
    let persona = state
        .orchestrator
        .edit_persona(&agent_id, &attributes)
        .await?;
    Ok(Json(ApiResponse::success(persona)))
}

/// Agents routes
pub fn agents_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/agents", get(list_agents))
        .route("/api/v1/agents/:id/persona", get(get_persona).patch(edit_persona))
}
