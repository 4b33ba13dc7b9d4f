use super::config::OrchestratorConfig;
use super::run::Run;
use super::types::{AgentInfo, AskMode, AskRequest, MemoryAnswer, RunState};
use crate::agents::{AgentProfile, AgentRegistry};
use crate::directives::{detect_task, parse_directives, score_sentiment};
use crate::error::{Error, Result};
use crate::event_bus::{EventBus, EventFilter, Subscription};
use crate::identity::Caller;
use crate::prompt::PromptBuilder;
use crate::room::{
    AgentPersona, InboxTask, MemoryRecord, MemoryView, Room, RoomMessage, RoomView, TaskStatus,
    TaskUpdate, UserSentiment, AUTO_NOTE_IMPORTANCE, DIRECTIVE_NOTE_IMPORTANCE,
};
use crate::security::{ContentGuard, GuardConfig};
use crate::store::{CommitBatch, PersonaMerge, RoomStore};
use crate::utils::{RateLimitConfig, RateLimiter};
use dashmap::DashMap;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tandem_llm::{CompletionRequest, Message};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const UNTITLED_ROOM: &str = "Untitled room";

/// Notes scanned when picking the memory excerpt for agent prompts
const EXCERPT_CANDIDATES: usize = 20;

/// The orchestrator: sole writer of summaries and agent-derived room state
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<AgentRegistry>,
    store: Arc<dyn RoomStore>,
    prompts: PromptBuilder,
    guard: ContentGuard,
    limiter: RateLimiter,
    events: EventBus,
    room_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Outcome of one staged agent call
struct StagedReply {
    agent: Arc<AgentProfile>,
    message: RoomMessage,
}

impl Orchestrator {
    /// Create an orchestrator with default config, guard, limiter and event bus
    #[must_use]
    pub fn new(registry: Arc<AgentRegistry>, store: Arc<dyn RoomStore>) -> Self {
        let config = OrchestratorConfig::default();
        Self {
            prompts: PromptBuilder::new(&registry)
                .with_windows(config.history_window, config.history_window_with_memory),
            guard: ContentGuard::new(GuardConfig {
                max_chars: config.max_content_chars,
                ..Default::default()
            }),
            limiter: RateLimiter::new(RateLimitConfig::default()),
            events: EventBus::default(),
            room_locks: DashMap::new(),
            config,
            registry,
            store,
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.prompts = PromptBuilder::new(&self.registry)
            .with_windows(config.history_window, config.history_window_with_memory);
        self.config = config;
        self
    }

    /// Replace the content guard
    #[must_use]
    pub fn with_guard(mut self, guard: ContentGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Replace the rate limiter
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Use a shared event bus
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Event bus runs publish to
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Rate limiter in front of `ask` and memory questions
    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Agent registry
    #[must_use]
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    // ========================================================================
    // Rooms
    // ========================================================================

    /// Create a room owned by the caller's organization
    pub async fn create_room(&self, caller: &Caller, name: &str) -> Result<Room> {
        let name = name.trim();
        let name = if name.is_empty() { UNTITLED_ROOM } else { name };
        self.guard.check(name)?;

        let room = Room::new(name, caller.org());
        self.store.create_room(&room).await?;
        info!(room_id = %room.id, org_id = %room.org_id, "Room created");
        Ok(room)
    }

    /// Room with its full ledger
    pub async fn get_room(&self, caller: &Caller, room_id: &str) -> Result<RoomView> {
        let room = self.load_room(caller, room_id).await?;
        self.room_view(room).await
    }

    /// Subscribe to run events visible to the caller
    ///
    /// Subscriptions only see the caller's organization. A room filter must
    /// name a room the caller may read.
    pub async fn subscribe_events(&self, caller: &Caller, mut filter: EventFilter) -> Result<Subscription> {
        if let Some(room_id) = filter.room_id.as_deref() {
            self.load_room(caller, room_id).await?;
        }
        filter.org_id = Some(caller.org().to_string());
        Ok(self.events.subscribe(filter))
    }

    // ========================================================================
    // Ask
    // ========================================================================

    /// Run one human message through the fan-out/synthesis state machine
    ///
    /// Validation happens before anything is stored: a rejected request leaves
    /// no trace. Once validated, the human message is appended immediately and
    /// survives a later failure; agent-derived writes are committed together.
    #[instrument(skip(self, caller, request), fields(room_id = %room_id, mode = ?request.mode))]
    pub async fn ask(&self, caller: &Caller, room_id: &str, request: AskRequest) -> Result<RoomView> {
        let mut run = Run::start(room_id, caller.org(), Some(request.user_id.clone()), self.events.clone());

        match self.execute(&mut run, caller, room_id, request).await {
            Ok(view) => Ok(view),
            Err(e) => {
                run.fail(&e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        run: &mut Run,
        caller: &Caller,
        room_id: &str,
        request: AskRequest,
    ) -> Result<RoomView> {
        // RECEIVED → ROUTED: admission, lookup, organization, targets, content
        self.admit(caller).await?;
        self.load_room(caller, room_id).await?;
        let targets = self.targets(&request)?;
        self.guard.check(&request.content)?;

        let lock = self.room_lock(room_id);
        let _room_guard = lock.lock().await;

        // Reload under the lock so summaries reflect every earlier commit
        let room = self.load_room(caller, room_id).await?;
        let history_len = self
            .config
            .history_window
            .max(self.config.history_window_with_memory);
        let history = self.store.recent_messages(room_id, history_len).await?;
        let excerpt = self.memory_excerpt(room_id).await?;

        let human = RoomMessage::human(
            room_id,
            &request.user_id,
            request.user_name.clone(),
            request.content.clone(),
        );
        self.store.append_message(&human).await?;
        run.advance(RunState::Routed, None);

        let mut batch = CommitBatch::new(room_id);

        // ROUTED → AGENT_CALLED+
        let mode = request.mode;
        let temperature_override = (mode == AskMode::Team).then_some(self.config.team_temperature);
        let calls = targets.iter().map(|agent| {
            let room = &room;
            let human = &human;
            let history = &history;
            let excerpt = &excerpt;
            async move {
                let persona = self.store.get_persona(&agent.id).await?;
                let messages = self.prompts.build_agent(
                    room,
                    agent,
                    persona.as_ref(),
                    human,
                    history,
                    excerpt,
                    mode,
                );
                let temperature = temperature_override.unwrap_or(agent.temperature);
                self.complete(agent, messages, temperature).await
            }
        });
        let results = join_all(calls).await;

        let mut drafts = Vec::with_capacity(targets.len());
        let mut summary_taken = false;
        for (agent, result) in targets.iter().zip(results) {
            let text = result?;
            let reply = StagedReply {
                agent: Arc::clone(agent),
                message: RoomMessage::agent(room_id, &agent.id, agent.name.clone(), text),
            };
            if self.stage_reply(&mut batch, &reply, !summary_taken) {
                summary_taken = true;
            }
            drafts.push(reply);
            run.advance(RunState::AgentCalled, Some(&agent.id));
        }

        // AGENT_CALLED → SYNTHESIZING → SYNTHESIZED
        let final_message = if mode == AskMode::Team {
            let coordinator = Arc::clone(self.registry.coordinator());
            run.advance(RunState::Synthesizing, Some(&coordinator.id));

            let labeled: Vec<(String, String)> = drafts
                .iter()
                .map(|d| (d.agent.name.clone(), d.message.content.clone()))
                .collect();
            let messages = self.prompts.build_coordinator(&room, &human, &labeled);
            let text = self
                .complete(&coordinator, messages, self.config.coordinator_temperature)
                .await?;

            let reply = StagedReply {
                message: RoomMessage::agent(room_id, &coordinator.id, coordinator.name.clone(), text),
                agent: coordinator,
            };
            // Coordinator summary always overrides
            self.stage_reply(&mut batch, &reply, true);
            run.advance(RunState::Synthesized, Some(&reply.agent.id));
            reply.message
        } else {
            let reply = drafts
                .pop()
                .ok_or_else(|| Error::UnknownAgent("no target agent".to_string()))?;
            run.advance(RunState::Synthesized, Some(&reply.agent.id));
            reply.message
        };

        // SYNTHESIZED → COMMITTED
        if detect_task(&final_message.content) {
            debug!(message_id = %final_message.id, "Reply queued as inbox task");
            batch.tasks.push(InboxTask::auto(request.user_id.clone(), &final_message));
        }
        batch.sentiments.push(UserSentiment::for_message(
            request.user_id.clone(),
            &human,
            score_sentiment(&human.content),
        ));

        let staged = batch.messages.len();
        self.store.commit(batch).await?;
        run.advance(RunState::Committed, None);
        info!(run_id = %run.id(), state = ?run.state(), replies = staged, "Run committed");

        let room = self.load_room(caller, room_id).await?;
        self.room_view(room).await
    }

    /// Stage a reply and its directives; returns true when a summary was applied
    fn stage_reply(&self, batch: &mut CommitBatch, reply: &StagedReply, accept_summary: bool) -> bool {
        let agent = &reply.agent;
        let directives = parse_directives(&reply.message.content);
        let mut applied = false;

        if let Some(summary) = directives.summary {
            if accept_summary {
                batch.summary = Some(summary);
                batch.memories.push(MemoryRecord::new(
                    batch.room_id.clone(),
                    agent.id.clone(),
                    format!("{} updated summary.", agent.name),
                    AUTO_NOTE_IMPORTANCE,
                ));
                applied = true;
            } else {
                debug!(agent = %agent.id, "Summary directive ignored, earlier teammate won");
            }
        }

        if !directives.persona.is_empty() {
            batch.persona_merges.push(PersonaMerge {
                agent_id: agent.id.clone(),
                display_name: agent.name.clone(),
                attributes: directives.persona,
            });
        }

        if let Some(note) = directives.memory {
            batch.memories.push(MemoryRecord::new(
                batch.room_id.clone(),
                agent.id.clone(),
                note,
                DIRECTIVE_NOTE_IMPORTANCE,
            ));
        }

        batch.messages.push(reply.message.clone());
        applied
    }

    // ========================================================================
    // Memory
    // ========================================================================

    /// Memory summary, the most recent notes and the note count
    pub async fn get_memory(&self, caller: &Caller, room_id: &str) -> Result<MemoryView> {
        let room = self.load_room(caller, room_id).await?;
        let notes = self
            .store
            .recent_memories(room_id, self.config.memory_view_notes)
            .await?;
        let count = self.store.memory_count(room_id).await?;

        Ok(MemoryView {
            memory_summary: room.memory_summary,
            notes,
            count,
        })
    }

    /// Answer a question from shared memory only, then record that it was asked
    #[instrument(skip(self, caller, question), fields(room_id = %room_id))]
    pub async fn query_memory(
        &self,
        caller: &Caller,
        room_id: &str,
        asker: &str,
        question: &str,
    ) -> Result<MemoryAnswer> {
        self.admit(caller).await?;
        let room = self.load_room(caller, room_id).await?;
        self.guard.check(question)?;

        let notes = self
            .store
            .recent_memories(room_id, self.config.memory_query_window)
            .await?;
        let context = PromptBuilder::memory_context(room.memory_summary.as_deref(), &notes);
        let messages = PromptBuilder::build_memory_query(&context, asker, question);

        let coordinator = Arc::clone(self.registry.coordinator());
        let answer = self
            .complete(&coordinator, messages, self.config.memory_query_temperature)
            .await?;

        let mut batch = CommitBatch::new(room_id);
        batch.memories.push(MemoryRecord::new(
            room_id,
            coordinator.id.clone(),
            format!("Memory was queried: {}", question),
            AUTO_NOTE_IMPORTANCE,
        ));
        self.store.commit(batch).await?;

        Ok(MemoryAnswer { answer })
    }

    // ========================================================================
    // Inbox and personas
    // ========================================================================

    /// Inbox of the calling user
    pub async fn list_inbox(&self, caller: &Caller, status: Option<TaskStatus>) -> Result<Vec<InboxTask>> {
        let user_id = require_user(caller)?;
        self.store.list_tasks(user_id, status).await
    }

    /// Update one of the calling user's tasks
    pub async fn update_task(&self, caller: &Caller, task_id: Uuid, update: &TaskUpdate) -> Result<InboxTask> {
        let user_id = require_user(caller)?;
        let task = self.store.update_task(user_id, task_id, update).await?;
        info!(task_id = %task_id, status = task.status.as_str(), "Inbox task updated");
        Ok(task)
    }

    /// Persona of a roster agent
    pub async fn get_persona(&self, agent_id: &str) -> Result<AgentPersona> {
        self.registry.resolve(agent_id)?;
        self.store
            .get_persona(agent_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("persona {}", agent_id)))
    }

    /// Explicit profile edit of a roster agent
    pub async fn edit_persona(&self, agent_id: &str, attributes: &[(String, String)]) -> Result<AgentPersona> {
        self.registry.resolve(agent_id)?;
        let persona = self.store.edit_persona(agent_id, attributes).await?;
        info!(agent = %agent_id, keys = attributes.len(), "Persona edited");
        Ok(persona)
    }

    /// Insert a persona for every roster agent that has none
    pub async fn seed_personas(&self) -> Result<()> {
        for agent in self.registry.all() {
            self.store
                .seed_persona(&AgentPersona::new(agent.id.clone(), agent.name.clone()))
                .await?;
        }
        debug!("Personas seeded");
        Ok(())
    }

    /// Public roster
    #[must_use]
    pub fn agents(&self) -> Vec<AgentInfo> {
        let coordinator_id = &self.registry.coordinator().id;
        self.registry
            .all()
            .map(|a| AgentInfo {
                id: a.id.clone(),
                name: a.name.clone(),
                speciality: a.speciality.clone(),
                description: a.description.clone(),
                coordinator: &a.id == coordinator_id,
            })
            .collect()
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn admit(&self, caller: &Caller) -> Result<()> {
        let key = caller.rate_limit_key();
        let result = self.limiter.acquire(&key).await;
        if result.allowed {
            Ok(())
        } else {
            warn!(key = %key, "Request rate limited");
            Err(Error::RateLimited {
                retry_after: result.retry_after_secs(),
            })
        }
    }

    async fn load_room(&self, caller: &Caller, room_id: &str) -> Result<Room> {
        let room = self
            .store
            .get_room(room_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("room {}", room_id)))?;

        if room.org_id != caller.org() {
            warn!(room_id = %room_id, org = caller.org(), "Cross-organization access denied");
            return Err(Error::Forbidden(format!("room {}", room_id)));
        }
        Ok(room)
    }

    async fn room_view(&self, room: Room) -> Result<RoomView> {
        let messages = self.store.list_messages(&room.id).await?;
        let memory_count = self.store.memory_count(&room.id).await?;
        Ok(RoomView::new(room, messages, memory_count))
    }

    fn targets(&self, request: &AskRequest) -> Result<Vec<Arc<AgentProfile>>> {
        if request.mode.is_single() {
            let agent_id = request
                .target_agent
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| self.registry.default_agent());
            Ok(vec![self.registry.resolve(agent_id)?])
        } else {
            Ok(self.registry.teammates().to_vec())
        }
    }

    async fn memory_excerpt(&self, room_id: &str) -> Result<Vec<MemoryRecord>> {
        if self.config.memory_excerpt_size == 0 {
            return Ok(Vec::new());
        }
        let mut notes = self.store.recent_memories(room_id, EXCERPT_CANDIDATES).await?;
        // Newest first, then by importance; the sort is stable
        notes.reverse();
        notes.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        notes.truncate(self.config.memory_excerpt_size);
        Ok(notes)
    }

    fn room_lock(&self, room_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(&self.room_locks.entry(room_id.to_string()).or_default())
    }

    async fn complete(&self, agent: &AgentProfile, messages: Vec<Message>, temperature: f32) -> Result<String> {
        let timeout = Duration::from_secs(self.config.agent_timeout_secs);
        debug!(agent = %agent.id, turns = messages.len(), "Calling agent");

        let request = CompletionRequest::new(agent.model.clone())
            .with_messages(messages)
            .with_temperature(temperature);

        let response = tokio::time::timeout(timeout, agent.channel.complete(request))
            .await
            .map_err(|_| tandem_llm::Error::Timeout(timeout.as_millis() as u64))??;

        Ok(response.content)
    }
}

fn require_user(caller: &Caller) -> Result<&str> {
    caller
        .user_id
        .as_deref()
        .ok_or_else(|| Error::Forbidden("user identity required".to_string()))
}
