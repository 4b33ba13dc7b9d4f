//! Room State Store
//!
//! Owns rooms, the message ledger, memory notes, personas, inbox tasks and
//! sentiment records. Agent-derived writes of one `ask` run arrive as a
//! single [`CommitBatch`] and are applied atomically.
//!
//! Backends:
//! - [`InMemoryStore`]: tests and development
//! - [`SqliteStore`]: default durable backend

mod memory;
mod sqlite;

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::room::{
    AgentPersona, InboxTask, MemoryRecord, Room, RoomMessage, TaskStatus, TaskUpdate,
    UserSentiment,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persona attributes to merge into an agent's persona
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaMerge {
    /// Agent identifier
    pub agent_id: String,
    /// Display name used if the persona does not exist yet
    pub display_name: String,
    /// Attributes in the order they were reported
    pub attributes: Vec<(String, String)>,
}

/// Every write staged by one orchestration run
#[derive(Debug, Clone, Default)]
pub struct CommitBatch {
    /// Room the batch belongs to
    pub room_id: String,
    /// Assistant messages, in ledger order
    pub messages: Vec<RoomMessage>,
    /// Replacement for both project and memory summary
    pub summary: Option<String>,
    /// Persona merges, applied in order
    pub persona_merges: Vec<PersonaMerge>,
    /// New memory notes
    pub memories: Vec<MemoryRecord>,
    /// New inbox tasks
    pub tasks: Vec<InboxTask>,
    /// New sentiment records
    pub sentiments: Vec<UserSentiment>,
}

impl CommitBatch {
    /// Empty batch for a room
    #[must_use]
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            ..Default::default()
        }
    }

    /// True when there is nothing to write
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.summary.is_none()
            && self.persona_merges.is_empty()
            && self.memories.is_empty()
            && self.tasks.is_empty()
            && self.sentiments.is_empty()
    }
}

/// Which backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// SQLite file
    #[default]
    Sqlite,
    /// Process memory
    Memory,
}

/// Durable room state
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Insert a new room
    async fn create_room(&self, room: &Room) -> Result<()>;

    /// Load a room
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>>;

    /// Append one message to the ledger immediately
    async fn append_message(&self, message: &RoomMessage) -> Result<()>;

    /// Last `limit` messages of a room, oldest first
    async fn recent_messages(&self, room_id: &str, limit: usize) -> Result<Vec<RoomMessage>>;

    /// Entire ledger of a room, oldest first
    async fn list_messages(&self, room_id: &str) -> Result<Vec<RoomMessage>>;

    /// Last `limit` memory notes of a room, oldest first
    async fn recent_memories(&self, room_id: &str, limit: usize) -> Result<Vec<MemoryRecord>>;

    /// Number of memory notes in a room
    async fn memory_count(&self, room_id: &str) -> Result<u64>;

    /// Insert a persona unless one already exists for the agent
    async fn seed_persona(&self, persona: &AgentPersona) -> Result<()>;

    /// Load an agent persona
    async fn get_persona(&self, agent_id: &str) -> Result<Option<AgentPersona>>;

    /// Explicit profile edit: shallow-merge attributes into an existing persona
    async fn edit_persona(
        &self,
        agent_id: &str,
        attributes: &[(String, String)],
    ) -> Result<AgentPersona>;

    /// Tasks owned by a user, newest first
    async fn list_tasks(&self, user_id: &str, status: Option<TaskStatus>) -> Result<Vec<InboxTask>>;

    /// Apply an explicit update to one of the user's tasks
    async fn update_task(
        &self,
        user_id: &str,
        task_id: Uuid,
        update: &TaskUpdate,
    ) -> Result<InboxTask>;

    /// Sentiment records of a room, oldest first
    async fn room_sentiments(&self, room_id: &str) -> Result<Vec<UserSentiment>>;

    /// Apply every write of a batch, or none of them
    async fn commit(&self, batch: CommitBatch) -> Result<()>;
}
