//! Room state model
//!
//! Rooms own an append-only message ledger and two rolling summaries. The
//! remaining records (memory notes, personas, inbox tasks, sentiment) hang off
//! rooms and agents and are written through the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Importance of notes produced by a `MEMORY_UPDATE` directive
pub const DIRECTIVE_NOTE_IMPORTANCE: f32 = 0.5;

/// Importance of notes generated automatically (summary changes, memory queries)
pub const AUTO_NOTE_IMPORTANCE: f32 = 0.1;

/// A collaboration room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Owning organization
    pub org_id: String,
    /// Project summary, replaced wholesale by directives
    pub project_summary: Option<String>,
    /// Memory summary, replaced wholesale by directives
    pub memory_summary: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// Create a new room with a fresh identifier and empty summaries
    #[must_use]
    pub fn new(name: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            org_id: org_id.into(),
            project_summary: None,
            memory_summary: None,
            created_at: Utc::now(),
        }
    }
}

/// Role of a ledger message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    /// Human participant
    User,
    /// Agent reply
    Assistant,
    /// System notice
    System,
}

impl SenderRole {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Parse from the stored representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Role used when replaying the message to a model
    #[must_use]
    pub fn llm_role(&self) -> tandem_llm::MessageRole {
        match self {
            Self::User => tandem_llm::MessageRole::User,
            Self::Assistant => tandem_llm::MessageRole::Assistant,
            Self::System => tandem_llm::MessageRole::System,
        }
    }
}

/// One entry of a room's message ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomMessage {
    /// Message identifier
    pub id: Uuid,
    /// Owning room
    pub room_id: String,
    /// `user:<id>` or `agent:<id>`
    pub sender: String,
    /// Sender display name
    pub sender_name: String,
    /// Message role
    pub role: SenderRole,
    /// Body text
    pub content: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl RoomMessage {
    /// Message written by a human
    #[must_use]
    pub fn human(
        room_id: impl Into<String>,
        user_id: &str,
        user_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            sender: format!("user:{}", user_id),
            sender_name: user_name.into(),
            role: SenderRole::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Reply written by an agent
    #[must_use]
    pub fn agent(
        room_id: impl Into<String>,
        agent_id: &str,
        agent_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            sender: format!("agent:{}", agent_id),
            sender_name: agent_name.into(),
            role: SenderRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// An append-only memory note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Record identifier
    pub id: Uuid,
    /// Owning room
    pub room_id: String,
    /// Agent the note is attributed to
    pub agent_id: String,
    /// Note text
    pub content: String,
    /// Importance in `0.0..=1.0`
    pub importance: f32,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Create a note, clamping importance to `0.0..=1.0`
    #[must_use]
    pub fn new(
        room_id: impl Into<String>,
        agent_id: impl Into<String>,
        content: impl Into<String>,
        importance: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            room_id: room_id.into(),
            agent_id: agent_id.into(),
            content: content.into(),
            importance: importance.clamp(0.0, 1.0),
            created_at: Utc::now(),
        }
    }
}

/// Editable persona of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPersona {
    /// Agent identifier
    pub agent_id: String,
    /// Display name
    pub display_name: String,
    /// Free-form attributes
    pub attributes: BTreeMap<String, String>,
    /// User the persona belongs to, if any
    pub owner_user_id: Option<String>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl AgentPersona {
    /// Persona with no attributes
    #[must_use]
    pub fn new(agent_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            display_name: display_name.into(),
            attributes: BTreeMap::new(),
            owner_user_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Shallow-merge attributes; reported keys overwrite existing ones
    pub fn merge<'a, I>(&mut self, attributes: I)
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        for (key, value) in attributes {
            self.attributes.insert(key.clone(), value.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Inbox task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for the user
    #[default]
    Open,
    /// Completed
    Done,
    /// Hidden from the default view
    Archived,
}

/// Inbox task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    /// Low
    Low,
    /// Normal
    #[default]
    Normal,
    /// High
    High,
}

macro_rules! text_enum {
    ($ty:ty { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the string representation
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            /// Parse from the stored representation
            #[must_use]
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

text_enum!(TaskStatus { Open => "open", Done => "done", Archived => "archived" });
text_enum!(TaskPriority { Low => "low", Normal => "normal", High => "high" });

/// A follow-up item in a user's inbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxTask {
    /// Task identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: String,
    /// Task text
    pub content: String,
    /// Originating room
    pub room_id: Option<String>,
    /// Originating message
    pub message_id: Option<Uuid>,
    /// Status
    pub status: TaskStatus,
    /// Priority
    pub priority: TaskPriority,
    /// Tags; detector-created tasks carry `auto`
    pub tags: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

impl InboxTask {
    /// Task created by the task detector from an agent reply
    #[must_use]
    pub fn auto(user_id: impl Into<String>, message: &RoomMessage) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            content: message.content.clone(),
            room_id: Some(message.room_id.clone()),
            message_id: Some(message.id),
            status: TaskStatus::Open,
            priority: TaskPriority::Normal,
            tags: vec!["auto".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an explicit update
    pub fn apply(&mut self, update: &TaskUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(tags) = &update.tags {
            self.tags = tags.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Explicit change to an inbox task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    /// New status
    #[serde(default)]
    pub status: Option<TaskStatus>,
    /// New priority
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    /// Replacement tag list
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Advisory sentiment of a human message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSentiment {
    /// Record identifier
    pub id: Uuid,
    /// User who wrote the message
    pub user_id: String,
    /// Room of the message
    pub room_id: String,
    /// Scored message
    pub message_id: Uuid,
    /// Score in `-1.0..=1.0`
    pub score: f32,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl UserSentiment {
    /// Record a score for a human message
    #[must_use]
    pub fn for_message(user_id: impl Into<String>, message: &RoomMessage, score: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            room_id: message.room_id.clone(),
            message_id: message.id,
            score: score.clamp(-1.0, 1.0),
            created_at: Utc::now(),
        }
    }
}

/// Room as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomView {
    /// Room identifier
    pub room_id: String,
    /// Room name
    pub room_name: String,
    /// Project summary
    pub project_summary: Option<String>,
    /// Memory summary
    pub memory_summary: Option<String>,
    /// Full ledger in insertion order
    pub messages: Vec<RoomMessage>,
    /// Number of memory notes
    pub memory_count: u64,
}

impl RoomView {
    /// Assemble a view
    #[must_use]
    pub fn new(room: Room, messages: Vec<RoomMessage>, memory_count: u64) -> Self {
        Self {
            room_id: room.id,
            room_name: room.name,
            project_summary: room.project_summary,
            memory_summary: room.memory_summary,
            messages,
            memory_count,
        }
    }
}

/// Shared memory as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryView {
    /// Memory summary
    pub memory_summary: Option<String>,
    /// Most recent notes, oldest first
    pub notes: Vec<MemoryRecord>,
    /// Total number of notes
    pub count: u64,
}
