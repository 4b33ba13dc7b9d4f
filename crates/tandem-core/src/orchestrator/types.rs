//! Orchestrator request and state types

use serde::{Deserialize, Serialize};

/// Routing mode of an `ask`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AskMode {
    /// The asker's own agent (single target)
    #[serde(rename = "self")]
    #[default]
    SelfAgent,
    /// A named teammate (single target)
    #[serde(rename = "teammate")]
    Teammate,
    /// Every teammate drafts, the coordinator synthesizes
    #[serde(rename = "team")]
    Team,
}

impl AskMode {
    /// True for modes that call exactly one agent
    #[must_use]
    pub fn is_single(&self) -> bool {
        !matches!(self, Self::Team)
    }
}

/// A human message submitted to a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// Asking user
    pub user_id: String,
    /// Asking user's display name
    pub user_name: String,
    /// Message text
    pub content: String,
    /// Routing mode
    #[serde(default)]
    pub mode: AskMode,
    /// Target for single-agent modes (default agent if absent)
    #[serde(default)]
    pub target_agent: Option<String>,
}

impl AskRequest {
    /// Create a request
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        content: impl Into<String>,
        mode: AskMode,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            content: content.into(),
            mode,
            target_agent: None,
        }
    }

    /// Name the target agent
    #[must_use]
    pub fn with_target(mut self, agent_id: impl Into<String>) -> Self {
        self.target_agent = Some(agent_id.into());
        self
    }
}

/// States of one `ask` run
///
/// ```text
/// RECEIVED → ROUTED → AGENT_CALLED+ → SYNTHESIZING → SYNTHESIZED → COMMITTED
///     └──────────┴───────────┴──────────────┴──────────────┴──────→ FAILED
/// ```
///
/// Single-agent runs go from `AGENT_CALLED` straight to `SYNTHESIZED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Request accepted for processing
    Received,
    /// Validated, human message persisted, targets resolved
    Routed,
    /// An agent reply was received and staged
    AgentCalled,
    /// Coordinator call in flight
    Synthesizing,
    /// Final reply staged
    Synthesized,
    /// Staged writes committed
    Committed,
    /// Run aborted; staged writes discarded
    Failed,
}

impl RunState {
    /// Terminal states accept no further transition
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    /// Whether `next` is a legal successor
    #[must_use]
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (*self, next),
            (Received, Routed)
                | (Routed, AgentCalled)
                | (AgentCalled, AgentCalled)
                | (AgentCalled, Synthesizing)
                | (AgentCalled, Synthesized)
                | (Synthesizing, Synthesized)
                | (Synthesized, Committed)
        )
    }
}

/// Answer to a memory question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryAnswer {
    /// Coordinator's answer
    pub answer: String,
}

/// Public description of a roster entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Agent identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Domain line
    pub speciality: String,
    /// Persona text
    pub description: String,
    /// Whether this is the coordinator
    pub coordinator: bool,
}
