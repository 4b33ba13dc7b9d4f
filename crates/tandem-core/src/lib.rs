//! Tandem Core - Shared Room Orchestration
//!
//! This crate provides the core of the Tandem shared workspace:
//! - Agents: the fixed roster of personas and their completion channels
//! - Directives: marker-based instructions embedded in agent replies
//! - Prompt: message sequences for teammate, coordinator and memory calls
//! - Orchestrator: the fan-out/synthesis state machine behind `ask`
//! - Store: rooms, the message ledger, memory, personas and inbox tasks
//! - Security: content guard in front of every agent call
//! - Event bus: best-effort lifecycle events for live observers
//! - Utils: request rate limiting

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agents;
pub mod directives;
pub mod error;
pub mod event_bus;
pub mod identity;
pub mod orchestrator;
pub mod prompt;
pub mod room;
pub mod security;
pub mod store;
pub mod utils;

pub use agents::{AgentDefinition, AgentProfile, AgentRegistry};
pub use directives::{detect_task, parse_directives, score_sentiment, Directives};
pub use error::{Error, Result, UserFriendlyError};
pub use event_bus::{EventBus, EventFilter, RoomEvent, Subscription};
pub use identity::Caller;
pub use orchestrator::{
    AgentInfo, AskMode, AskRequest, MemoryAnswer, Orchestrator, OrchestratorConfig, RunState,
};
pub use prompt::PromptBuilder;
pub use room::{
    AgentPersona, InboxTask, MemoryRecord, MemoryView, Room, RoomMessage, RoomView, SenderRole,
    TaskPriority, TaskStatus, TaskUpdate, UserSentiment,
};
pub use security::{ContentGuard, GuardConfig};
pub use store::{CommitBatch, InMemoryStore, RoomStore, SqliteStore, StoreBackend};
pub use utils::{RateLimitConfig, RateLimitResult, RateLimiter};
