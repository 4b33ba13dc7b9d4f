//! In-memory room store for tests and development

use super::{CommitBatch, RoomStore};
use crate::error::{Error, Result};
use crate::room::{
    AgentPersona, InboxTask, MemoryRecord, Room, RoomMessage, TaskStatus, TaskUpdate,
    UserSentiment,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct State {
    rooms: HashMap<String, Room>,
    messages: HashMap<String, Vec<RoomMessage>>,
    memories: HashMap<String, Vec<MemoryRecord>>,
    personas: HashMap<String, AgentPersona>,
    /// Insertion order
    tasks: Vec<InboxTask>,
    sentiments: Vec<UserSentiment>,
}

/// In-memory store; everything lives behind one lock
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn tail<T: Clone>(items: Option<&Vec<T>>, limit: usize) -> Vec<T> {
    items
        .map(|items| items[items.len().saturating_sub(limit)..].to_vec())
        .unwrap_or_default()
}

#[async_trait]
impl RoomStore for InMemoryStore {
    async fn create_room(&self, room: &Room) -> Result<()> {
        let mut state = self.state.write().await;
        if state.rooms.contains_key(&room.id) {
            return Err(Error::Store(format!("room {} already exists", room.id)));
        }
        state.rooms.insert(room.id.clone(), room.clone());
        Ok(())
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>> {
        Ok(self.state.read().await.rooms.get(room_id).cloned())
    }

    async fn append_message(&self, message: &RoomMessage) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.rooms.contains_key(&message.room_id) {
            return Err(Error::NotFound(format!("room {}", message.room_id)));
        }
        state
            .messages
            .entry(message.room_id.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn recent_messages(&self, room_id: &str, limit: usize) -> Result<Vec<RoomMessage>> {
        Ok(tail(self.state.read().await.messages.get(room_id), limit))
    }

    async fn list_messages(&self, room_id: &str) -> Result<Vec<RoomMessage>> {
        Ok(self
            .state
            .read()
            .await
            .messages
            .get(room_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn recent_memories(&self, room_id: &str, limit: usize) -> Result<Vec<MemoryRecord>> {
        Ok(tail(self.state.read().await.memories.get(room_id), limit))
    }

    async fn memory_count(&self, room_id: &str) -> Result<u64> {
        Ok(self
            .state
            .read()
            .await
            .memories
            .get(room_id)
            .map_or(0, |m| m.len() as u64))
    }

    async fn seed_persona(&self, persona: &AgentPersona) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .personas
            .entry(persona.agent_id.clone())
            .or_insert_with(|| persona.clone());
        Ok(())
    }

    async fn get_persona(&self, agent_id: &str) -> Result<Option<AgentPersona>> {
        Ok(self.state.read().await.personas.get(agent_id).cloned())
    }

    async fn edit_persona(
        &self,
        agent_id: &str,
        attributes: &[(String, String)],
    ) -> Result<AgentPersona> {
        let mut state = self.state.write().await;
        let persona = state
            .personas
            .get_mut(agent_id)
            .ok_or_else(|| Error::NotFound(format!("persona {}", agent_id)))?;
        persona.merge(attributes);
        Ok(persona.clone())
    }

    async fn list_tasks(&self, user_id: &str, status: Option<TaskStatus>) -> Result<Vec<InboxTask>> {
        let state = self.state.read().await;
        Ok(state
            .tasks
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect())
    }

    async fn update_task(
        &self,
        user_id: &str,
        task_id: Uuid,
        update: &TaskUpdate,
    ) -> Result<InboxTask> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("task {}", task_id)))?;
        task.apply(update);
        Ok(task.clone())
    }

    async fn room_sentiments(&self, room_id: &str) -> Result<Vec<UserSentiment>> {
        let state = self.state.read().await;
        Ok(state
            .sentiments
            .iter()
            .filter(|s| s.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn commit(&self, batch: CommitBatch) -> Result<()> {
        let mut state = self.state.write().await;

        // Validate before mutating so a failed commit leaves nothing behind
        if !state.rooms.contains_key(&batch.room_id) {
            return Err(Error::NotFound(format!("room {}", batch.room_id)));
        }

        let CommitBatch {
            room_id,
            messages,
            summary,
            persona_merges,
            memories,
            tasks,
            sentiments,
        } = batch;

        debug!(
            room_id = %room_id,
            messages = messages.len(),
            memories = memories.len(),
            tasks = tasks.len(),
            "Committing batch"
        );

        state
            .messages
            .entry(room_id.clone())
            .or_default()
            .extend(messages);

        if let Some(summary) = summary {
            if let Some(room) = state.rooms.get_mut(&room_id) {
                room.project_summary = Some(summary.clone());
                room.memory_summary = Some(summary);
            }
        }

        for merge in persona_merges {
            let persona = state
                .personas
                .entry(merge.agent_id.clone())
                .or_insert_with(|| AgentPersona::new(merge.agent_id.clone(), merge.display_name.clone()));
            persona.merge(&merge.attributes);
        }

        state.memories.entry(room_id).or_default().extend(memories);
        state.tasks.extend(tasks);
        state.sentiments.extend(sentiments);
        Ok(())
    }
}
