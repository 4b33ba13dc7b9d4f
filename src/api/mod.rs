//! HTTP API for Tandem
//!
//! Provides REST endpoints for:
//! - Rooms and the ask flow
//! - Shared memory and memory questions
//! - Per-user inbox
//! - Agent roster and personas
//! - Live run events (SSE)
//! - Health

pub mod agents;
pub mod caller;
pub mod error;
pub mod events;
pub mod health;
pub mod inbox;
pub mod memory;
pub mod rooms;

use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::Orchestrator;
use tokio_util::sync::CancellationToken;

pub use agents::agents_routes;
pub use caller::CallerIdentity;
pub use error::{ApiError, ApiResult};
pub use events::events_routes;
pub use health::health_routes;
pub use inbox::inbox_routes;
pub use memory::memory_routes;
pub use rooms::rooms_routes;

/// Response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            code: Some(code.into()),
        }
    }
}

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Interval between SSE keep-alive comments
    pub keep_alive: Duration,
    /// Cancelled on shutdown; ends open event streams
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            keep_alive: Duration::from_secs(15),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Create the router with every endpoint
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(rooms_routes())
        .merge(memory_routes())
        .merge(inbox_routes())
        .merge(agents_routes())
        .merge(events_routes())
        .with_state(state)
}
