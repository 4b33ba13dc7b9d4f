use crate::orchestrator::RunState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted while an `ask` run moves through its states.
///
/// Events carry identifiers and state names only; message bodies are fetched
/// through the room endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    /// A run entered a new state
    Status {
        /// Run identifier
        run_id: Uuid,
        /// Room of the run
        room_id: String,
        /// Organization of the caller
        org_id: String,
        /// User who asked
        user_id: Option<String>,
        /// State entered
        state: RunState,
        /// Agent involved in this transition, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        agent_id: Option<String>,
        /// Transition time
        at: DateTime<Utc>,
    },
    /// A run failed
    Error {
        /// Run identifier
        run_id: Uuid,
        /// Room of the run
        room_id: String,
        /// Organization of the caller
        org_id: String,
        /// User who asked
        user_id: Option<String>,
        /// Machine-readable error code
        code: String,
        /// Error description (sanitized)
        error: String,
        /// Failure time
        at: DateTime<Utc>,
    },
}

impl RoomEvent {
    /// Get the run ID for this event.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::Status { run_id, .. } | Self::Error { run_id, .. } => *run_id,
        }
    }

    /// Room the event belongs to.
    #[must_use]
    pub fn room_id(&self) -> &str {
        match self {
            Self::Status { room_id, .. } | Self::Error { room_id, .. } => room_id,
        }
    }

    /// Organization the event belongs to.
    #[must_use]
    pub fn org_id(&self) -> &str {
        match self {
            Self::Status { org_id, .. } | Self::Error { org_id, .. } => org_id,
        }
    }

    /// User the event belongs to.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Status { user_id, .. } | Self::Error { user_id, .. } => user_id.as_deref(),
        }
    }

    /// Event kind, used as the SSE event name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Error { .. } => "error",
        }
    }
}

/// Which events a subscriber wants; `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Only events for this room
    #[serde(default)]
    pub room_id: Option<String>,
    /// Only events for this user
    #[serde(default)]
    pub user_id: Option<String>,
    /// Only events for this organization; set by the server, never parsed
    #[serde(skip)]
    pub org_id: Option<String>,
}

impl EventFilter {
    /// True when the event passes the filter.
    #[must_use]
    pub fn matches(&self, event: &RoomEvent) -> bool {
        let room_ok = self
            .room_id
            .as_deref()
            .map_or(true, |room| room == event.room_id());
        let user_ok = self
            .user_id
            .as_deref()
            .map_or(true, |user| Some(user) == event.user_id());
        let org_ok = self
            .org_id
            .as_deref()
            .map_or(true, |org| org == event.org_id());
        room_ok && user_ok && org_ok
    }
}
