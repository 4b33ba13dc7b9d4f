//! Per-run state tracking

use super::types::RunState;
use crate::error::Error;
use crate::event_bus::{EventBus, RoomEvent};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

/// State of one `ask` run; every transition is logged and published
pub(crate) struct Run {
    id: Uuid,
    room_id: String,
    org_id: String,
    user_id: Option<String>,
    state: RunState,
    events: EventBus,
}

impl Run {
    /// Start a run in `RECEIVED`
    pub(crate) fn start(room_id: &str, org_id: &str, user_id: Option<String>, events: EventBus) -> Self {
        let run = Self {
            id: Uuid::new_v4(),
            room_id: room_id.to_string(),
            org_id: org_id.to_string(),
            user_id,
            state: RunState::Received,
            events,
        };
        info!(run_id = %run.id, room_id = %run.room_id, state = ?run.state, "Run state");
        run.publish_status(None);
        run
    }

    pub(crate) fn id(&self) -> Uuid {
        self.id
    }

    pub(crate) fn state(&self) -> RunState {
        self.state
    }

    /// Move to `next`, tagging the transition with an agent when relevant
    pub(crate) fn advance(&mut self, next: RunState, agent_id: Option<&str>) {
        if !self.state.can_transition_to(next) {
            warn!(run_id = %self.id, from = ?self.state, to = ?next, "Unexpected run transition");
        }
        self.state = next;
        info!(run_id = %self.id, room_id = %self.room_id, state = ?next, agent = agent_id, "Run state");
        self.publish_status(agent_id);
    }

    /// Move to `FAILED` and publish an error event
    pub(crate) fn fail(&mut self, error: &Error) {
        if self.state.is_terminal() {
            return;
        }
        warn!(run_id = %self.id, room_id = %self.room_id, from = ?self.state, error = %error, "Run failed");
        self.state = RunState::Failed;
        self.events.publish(RoomEvent::Error {
            run_id: self.id,
            room_id: self.room_id.clone(),
            org_id: self.org_id.clone(),
            user_id: self.user_id.clone(),
            code: error.code().to_string(),
            error: error.to_string(),
            at: Utc::now(),
        });
    }

    fn publish_status(&self, agent_id: Option<&str>) {
        self.events.publish(RoomEvent::Status {
            run_id: self.id,
            room_id: self.room_id.clone(),
            org_id: self.org_id.clone(),
            user_id: self.user_id.clone(),
            state: self.state,
            agent_id: agent_id.map(str::to_string),
            at: Utc::now(),
        });
    }
}
