//! SQLite room store
//!
//! The default durable backend. Ledger tables carry an autoincrement `seq`
//! column so per-room order is insertion order regardless of timestamps.
//!
//! ```no_run
//! use tandem_core::store::SqliteStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::new("data/tandem.db").await?;
//! # Ok(())
//! # }
//! ```

use super::{CommitBatch, RoomStore};
use crate::error::{Error, Result};
use crate::room::{
    AgentPersona, InboxTask, MemoryRecord, Room, RoomMessage, SenderRole, TaskPriority,
    TaskStatus, TaskUpdate, UserSentiment,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

type RoomRow = (String, String, String, Option<String>, Option<String>, String);
type MessageRow = (String, String, String, String, String, String, String);
type MemoryRow = (String, String, String, String, f64, String);
type PersonaRow = (String, String, String, Option<String>, String);
type TaskRow = (
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
    String,
    String,
);
type SentimentRow = (String, String, String, String, f64, String);

const MESSAGE_COLUMNS: &str = "id, room_id, sender, sender_name, role, content, created_at";
const MEMORY_COLUMNS: &str = "id, room_id, agent_id, content, importance, created_at";
const TASK_COLUMNS: &str =
    "id, user_id, content, room_id, message_id, status, priority, tags, created_at, updated_at";

/// SQLite room store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |e| Error::Store(format!("{}: {}", context, e))
}

impl SqliteStore {
    /// Open (or create) a store at the specified path
    ///
    /// # Errors
    ///
    /// Returns error if database creation or schema setup fails.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Store(format!("Failed to create database directory: {}", e))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Store(format!("Invalid SQLite path: {}", e)))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(db_err("Failed to connect to SQLite"))?;

        let store = Self { pool };
        store.init_schema().await?;

        info!(path = %path.display(), "SQLite room store initialized");
        Ok(store)
    }

    /// Initialize the database schema
    async fn init_schema(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS rooms (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                org_id TEXT NOT NULL,
                project_summary TEXT,
                memory_summary TEXT,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                room_id TEXT NOT NULL REFERENCES rooms(id),
                sender TEXT NOT NULL,
                sender_name TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_messages_room_seq ON messages(room_id, seq)",
            r#"
            CREATE TABLE IF NOT EXISTS memories (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                room_id TEXT NOT NULL REFERENCES rooms(id),
                agent_id TEXT NOT NULL,
                content TEXT NOT NULL,
                importance REAL NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_memories_room_seq ON memories(room_id, seq)",
            r#"
            CREATE TABLE IF NOT EXISTS personas (
                agent_id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                attributes TEXT NOT NULL DEFAULT '{}',
                owner_user_id TEXT,
                updated_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS inbox_tasks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                room_id TEXT,
                message_id TEXT,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_inbox_tasks_user ON inbox_tasks(user_id, seq)",
            r#"
            CREATE TABLE IF NOT EXISTS sentiments (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                room_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                score REAL NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err("Failed to initialize schema"))?;
        }

        debug!("SQLite room schema initialized");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Health check failed"))?;
        Ok(true)
    }

    async fn load_task(&self, task_id: Uuid) -> Result<Option<InboxTask>> {
        let row: Option<TaskRow> = sqlx::query_as(&format!(
            "SELECT {} FROM inbox_tasks WHERE id = ?",
            TASK_COLUMNS
        ))
        .bind(task_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to load task"))?;

        row.map(task_from_row).transpose()
    }
}

// ============================================================================
// Row conversion
// ============================================================================

fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Store(format!("Invalid timestamp '{}': {}", value, e)))
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| Error::Store(format!("Invalid id '{}': {}", value, e)))
}

fn room_from_row(row: RoomRow) -> Result<Room> {
    let (id, name, org_id, project_summary, memory_summary, created_at) = row;
    Ok(Room {
        id,
        name,
        org_id,
        project_summary,
        memory_summary,
        created_at: parse_time(&created_at)?,
    })
}

fn message_from_row(row: MessageRow) -> Result<RoomMessage> {
    let (id, room_id, sender, sender_name, role, content, created_at) = row;
    Ok(RoomMessage {
        id: parse_uuid(&id)?,
        room_id,
        sender,
        sender_name,
        role: SenderRole::parse(&role)
            .ok_or_else(|| Error::Store(format!("Invalid message role '{}'", role)))?,
        content,
        created_at: parse_time(&created_at)?,
    })
}

fn memory_from_row(row: MemoryRow) -> Result<MemoryRecord> {
    let (id, room_id, agent_id, content, importance, created_at) = row;
    Ok(MemoryRecord {
        id: parse_uuid(&id)?,
        room_id,
        agent_id,
        content,
        importance: importance as f32,
        created_at: parse_time(&created_at)?,
    })
}

fn persona_from_row(row: PersonaRow) -> Result<AgentPersona> {
    let (agent_id, display_name, attributes, owner_user_id, updated_at) = row;
    let attributes: BTreeMap<String, String> = serde_json::from_str(&attributes)
        .map_err(|e| Error::Store(format!("Failed to deserialize persona: {}", e)))?;
    Ok(AgentPersona {
        agent_id,
        display_name,
        attributes,
        owner_user_id,
        updated_at: parse_time(&updated_at)?,
    })
}

fn task_from_row(row: TaskRow) -> Result<InboxTask> {
    let (id, user_id, content, room_id, message_id, status, priority, tags, created_at, updated_at) =
        row;
    Ok(InboxTask {
        id: parse_uuid(&id)?,
        user_id,
        content,
        room_id,
        message_id: message_id.as_deref().map(parse_uuid).transpose()?,
        status: TaskStatus::parse(&status)
            .ok_or_else(|| Error::Store(format!("Invalid task status '{}'", status)))?,
        priority: TaskPriority::parse(&priority)
            .ok_or_else(|| Error::Store(format!("Invalid task priority '{}'", priority)))?,
        tags: serde_json::from_str(&tags)
            .map_err(|e| Error::Store(format!("Failed to deserialize tags: {}", e)))?,
        created_at: parse_time(&created_at)?,
        updated_at: parse_time(&updated_at)?,
    })
}

fn sentiment_from_row(row: SentimentRow) -> Result<UserSentiment> {
    let (id, user_id, room_id, message_id, score, created_at) = row;
    Ok(UserSentiment {
        id: parse_uuid(&id)?,
        user_id,
        room_id,
        message_id: parse_uuid(&message_id)?,
        score: score as f32,
        created_at: parse_time(&created_at)?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Store(format!("Failed to serialize: {}", e)))
}

// ============================================================================
// RoomStore
// ============================================================================

#[async_trait]
impl RoomStore for SqliteStore {
    async fn create_room(&self, room: &Room) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rooms (id, name, org_id, project_summary, memory_summary, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&room.id)
        .bind(&room.name)
        .bind(&room.org_id)
        .bind(&room.project_summary)
        .bind(&room.memory_summary)
        .bind(room.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to create room"))?;

        debug!(room_id = %room.id, "Room saved to SQLite");
        Ok(())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>> {
        let row: Option<RoomRow> = sqlx::query_as(
            "SELECT id, name, org_id, project_summary, memory_summary, created_at FROM rooms WHERE id = ?",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to get room"))?;

        row.map(room_from_row).transpose()
    }

    async fn append_message(&self, message: &RoomMessage) -> Result<()> {
        let exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM rooms WHERE id = ?")
            .bind(&message.room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("Failed to check room"))?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("room {}", message.room_id)));
        }

        insert_message(&self.pool, message).await
    }

    async fn recent_messages(&self, room_id: &str, limit: usize) -> Result<Vec<RoomMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM (SELECT seq, {} FROM messages WHERE room_id = ? ORDER BY seq DESC LIMIT ?) ORDER BY seq ASC",
            MESSAGE_COLUMNS, MESSAGE_COLUMNS
        ))
        .bind(room_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load recent messages"))?;

        rows.into_iter().map(message_from_row).collect()
    }

    async fn list_messages(&self, room_id: &str) -> Result<Vec<RoomMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "SELECT {} FROM messages WHERE room_id = ? ORDER BY seq ASC",
            MESSAGE_COLUMNS
        ))
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list messages"))?;

        rows.into_iter().map(message_from_row).collect()
    }

    async fn recent_memories(&self, room_id: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        let rows: Vec<MemoryRow> = sqlx::query_as(&format!(
            "SELECT {} FROM (SELECT seq, {} FROM memories WHERE room_id = ? ORDER BY seq DESC LIMIT ?) ORDER BY seq ASC",
            MEMORY_COLUMNS, MEMORY_COLUMNS
        ))
        .bind(room_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to load memories"))?;

        rows.into_iter().map(memory_from_row).collect()
    }

    async fn memory_count(&self, room_id: &str) -> Result<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM memories WHERE room_id = ?")
            .bind(room_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to count memories"))?;

        Ok(row.0 as u64)
    }

    async fn seed_persona(&self, persona: &AgentPersona) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO personas (agent_id, display_name, attributes, owner_user_id, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(agent_id) DO NOTHING
            "#,
        )
        .bind(&persona.agent_id)
        .bind(&persona.display_name)
        .bind(to_json(&persona.attributes)?)
        .bind(&persona.owner_user_id)
        .bind(persona.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to seed persona"))?;
        Ok(())
    }

    async fn get_persona(&self, agent_id: &str) -> Result<Option<AgentPersona>> {
        let row: Option<PersonaRow> = sqlx::query_as(
            "SELECT agent_id, display_name, attributes, owner_user_id, updated_at FROM personas WHERE agent_id = ?",
        )
        .bind(agent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("Failed to get persona"))?;

        row.map(persona_from_row).transpose()
    }

    async fn edit_persona(
        &self,
        agent_id: &str,
        attributes: &[(String, String)],
    ) -> Result<AgentPersona> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        let row: Option<PersonaRow> = sqlx::query_as(
            "SELECT agent_id, display_name, attributes, owner_user_id, updated_at FROM personas WHERE agent_id = ?",
        )
        .bind(agent_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err("Failed to get persona"))?;

        let mut persona = row
            .map(persona_from_row)
            .transpose()?
            .ok_or_else(|| Error::NotFound(format!("persona {}", agent_id)))?;
        persona.merge(attributes);

        sqlx::query("UPDATE personas SET attributes = ?, updated_at = ? WHERE agent_id = ?")
            .bind(to_json(&persona.attributes)?)
            .bind(persona.updated_at.to_rfc3339())
            .bind(agent_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to update persona"))?;

        tx.commit().await.map_err(db_err("Failed to commit persona edit"))?;
        Ok(persona)
    }

    async fn list_tasks(&self, user_id: &str, status: Option<TaskStatus>) -> Result<Vec<InboxTask>> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {} FROM inbox_tasks WHERE user_id = ? AND (? IS NULL OR status = ?) ORDER BY seq DESC",
            TASK_COLUMNS
        ))
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list tasks"))?;

        rows.into_iter().map(task_from_row).collect()
    }

    async fn update_task(
        &self,
        user_id: &str,
        task_id: Uuid,
        update: &TaskUpdate,
    ) -> Result<InboxTask> {
        let mut task = self
            .load_task(task_id)
            .await?
            .filter(|t| t.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("task {}", task_id)))?;
        task.apply(update);

        sqlx::query(
            "UPDATE inbox_tasks SET status = ?, priority = ?, tags = ?, updated_at = ? WHERE id = ?",
        )
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(to_json(&task.tags)?)
        .bind(task.updated_at.to_rfc3339())
        .bind(task.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to update task"))?;

        Ok(task)
    }

    async fn room_sentiments(&self, room_id: &str) -> Result<Vec<UserSentiment>> {
        let rows: Vec<SentimentRow> = sqlx::query_as(
            "SELECT id, user_id, room_id, message_id, score, created_at FROM sentiments WHERE room_id = ? ORDER BY seq ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list sentiments"))?;

        rows.into_iter().map(sentiment_from_row).collect()
    }

    async fn commit(&self, batch: CommitBatch) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err("Failed to begin transaction"))?;

        if let Some(summary) = &batch.summary {
            let result = sqlx::query(
                "UPDATE rooms SET project_summary = ?, memory_summary = ? WHERE id = ?",
            )
            .bind(summary)
            .bind(summary)
            .bind(&batch.room_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to update summary"))?;
            if result.rows_affected() == 0 {
                return Err(Error::NotFound(format!("room {}", batch.room_id)));
            }
        }

        for message in &batch.messages {
            insert_message(&mut *tx, message).await?;
        }

        for merge in &batch.persona_merges {
            let row: Option<PersonaRow> = sqlx::query_as(
                "SELECT agent_id, display_name, attributes, owner_user_id, updated_at FROM personas WHERE agent_id = ?",
            )
            .bind(&merge.agent_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err("Failed to get persona"))?;

            let mut persona = match row {
                Some(row) => persona_from_row(row)?,
                None => AgentPersona::new(merge.agent_id.clone(), merge.display_name.clone()),
            };
            persona.merge(&merge.attributes);

            sqlx::query(
                r#"
                INSERT INTO personas (agent_id, display_name, attributes, owner_user_id, updated_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(agent_id) DO UPDATE SET
                    attributes = excluded.attributes,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&persona.agent_id)
            .bind(&persona.display_name)
            .bind(to_json(&persona.attributes)?)
            .bind(&persona.owner_user_id)
            .bind(persona.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to merge persona"))?;
        }

        for memory in &batch.memories {
            sqlx::query(
                "INSERT INTO memories (id, room_id, agent_id, content, importance, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(memory.id.to_string())
            .bind(&memory.room_id)
            .bind(&memory.agent_id)
            .bind(&memory.content)
            .bind(f64::from(memory.importance))
            .bind(memory.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert memory"))?;
        }

        for task in &batch.tasks {
            sqlx::query(&format!(
                "INSERT INTO inbox_tasks ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                TASK_COLUMNS
            ))
            .bind(task.id.to_string())
            .bind(&task.user_id)
            .bind(&task.content)
            .bind(&task.room_id)
            .bind(task.message_id.map(|id| id.to_string()))
            .bind(task.status.as_str())
            .bind(task.priority.as_str())
            .bind(to_json(&task.tags)?)
            .bind(task.created_at.to_rfc3339())
            .bind(task.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert task"))?;
        }

        for sentiment in &batch.sentiments {
            sqlx::query(
                "INSERT INTO sentiments (id, user_id, room_id, message_id, score, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(sentiment.id.to_string())
            .bind(&sentiment.user_id)
            .bind(&sentiment.room_id)
            .bind(sentiment.message_id.to_string())
            .bind(f64::from(sentiment.score))
            .bind(sentiment.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(db_err("Failed to insert sentiment"))?;
        }

        tx.commit().await.map_err(db_err("Failed to commit batch"))?;

        debug!(
            room_id = %batch.room_id,
            messages = batch.messages.len(),
            memories = batch.memories.len(),
            tasks = batch.tasks.len(),
            "Batch committed to SQLite"
        );
        Ok(())
    }
}

async fn insert_message<'e, E>(executor: E, message: &RoomMessage) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(&format!(
        "INSERT INTO messages ({}) VALUES (?, ?, ?, ?, ?, ?, ?)",
        MESSAGE_COLUMNS
    ))
    .bind(message.id.to_string())
    .bind(&message.room_id)
    .bind(&message.sender)
    .bind(&message.sender_name)
    .bind(message.role.as_str())
    .bind(&message.content)
    .bind(message.created_at.to_rfc3339())
    .execute(executor)
    .await
    .map_err(db_err("Failed to insert message"))?;
    Ok(())
}
