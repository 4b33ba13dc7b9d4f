//! Prompt construction
//!
//! Every function here is pure: it turns room state into the ordered
//! `(role, text)` turns sent to one completion call.

use crate::agents::{AgentProfile, AgentRegistry};
use crate::orchestrator::AskMode;
use crate::room::{AgentPersona, MemoryRecord, Room, RoomMessage};
use std::fmt::Write;
use tandem_llm::Message;

/// History window without a memory excerpt
pub const DEFAULT_HISTORY_WINDOW: usize = 12;
/// History window when memory notes are injected
pub const DEFAULT_HISTORY_WINDOW_WITH_MEMORY: usize = 8;

const EMPTY_SUMMARY: &str = "(empty yet)";
const NO_PROJECT_SUMMARY: &str = "(none yet)";
const EMPTY_MEMORY: &str = "(empty)";

const GUIDELINES: &str = "Guidelines:
- When answering, you may rely on the summary above to know what teammates are doing.
- Do not interrupt or change others' work unless asked; offer handoff steps or integration tips instead.
- To record a durable fact for the team, end your reply with `MEMORY_UPDATE: <note>`.
- To adjust your own persona, end your reply with `PERSONA_UPDATE:` followed by `key: value` lines.
- Everything after a marker belongs to it, so use at most one marker per reply.
- If you think the memory summary should be updated, include at the end:

SUMMARY_UPDATE:
<1–3 sentences>";

const COORDINATOR_INSTRUCTIONS: &str = "You are the coordinator. Synthesize the teammates' drafts into one clear answer.
Resolve contradictions between drafts and call out trade-offs explicitly.
Finish with 2–5 concrete next steps, naming who should own each one.
If the project summary should change, include at the end:

SUMMARY_UPDATE:
<1–3 sentences>";

const MEMORY_INSTRUCTIONS: &str =
    "You are the project memory. Answer using only the provided memory context.";

/// Builds message sequences for agent, coordinator and memory calls
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    /// `(name, speciality)` of every teammate, in registry order
    roster: Vec<(String, String)>,
    history_window: usize,
    history_window_with_memory: usize,
}

impl PromptBuilder {
    /// Create a builder whose roster lists the registry's teammates
    #[must_use]
    pub fn new(registry: &AgentRegistry) -> Self {
        Self {
            roster: registry
                .teammates()
                .iter()
                .map(|a| (a.name.clone(), a.speciality.clone()))
                .collect(),
            history_window: DEFAULT_HISTORY_WINDOW,
            history_window_with_memory: DEFAULT_HISTORY_WINDOW_WITH_MEMORY,
        }
    }

    /// Override the history windows
    #[must_use]
    pub fn with_windows(mut self, plain: usize, with_memory: usize) -> Self {
        self.history_window = plain;
        self.history_window_with_memory = with_memory;
        self
    }

    /// Number of ledger messages replayed for a call
    #[must_use]
    pub fn window(&self, has_memory_excerpt: bool) -> usize {
        if has_memory_excerpt {
            self.history_window_with_memory
        } else {
            self.history_window
        }
    }

    /// Shared context block: summary, roster and guidelines
    #[must_use]
    pub fn system_context(&self, room: &Room) -> String {
        let mut out = String::new();
        out.push_str("Shared Memory Summary (not auto-shown to users unless asked):\n");
        out.push_str(non_empty(room.memory_summary.as_deref()).unwrap_or(EMPTY_SUMMARY));
        out.push_str("\n\nTeam members:\n");
        for (name, speciality) in &self.roster {
            let _ = writeln!(out, "- {} ({})", name, speciality);
        }
        out.push('\n');
        out.push_str(GUIDELINES);
        out.push('\n');
        out
    }

    /// Prompt for one teammate call
    ///
    /// `history` is the ledger snapshot taken before the current human
    /// message was appended; only its last N entries are replayed.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn build_agent(
        &self,
        room: &Room,
        agent: &AgentProfile,
        persona: Option<&AgentPersona>,
        human: &RoomMessage,
        history: &[RoomMessage],
        memory_excerpt: &[MemoryRecord],
        mode: AskMode,
    ) -> Vec<Message> {
        let mut system = identity_block(agent, persona, mode);
        system.push_str("\n\n");
        system.push_str(&self.system_context(room));

        let mut messages = vec![Message::system(system)];

        if !memory_excerpt.is_empty() {
            let mut notes = String::from("Relevant memory notes:");
            for note in memory_excerpt {
                let _ = write!(notes, "\n- {}", note.content);
            }
            messages.push(Message::system(notes));
        }

        let window = self.window(!memory_excerpt.is_empty());
        let start = history.len().saturating_sub(window);
        messages.extend(history[start..].iter().map(replay));

        messages.push(latest_turn(human));
        messages
    }

    /// Prompt for the coordinator's synthesis call
    ///
    /// `drafts` are `(display_name, text)` pairs in registry order.
    #[must_use]
    pub fn build_coordinator(
        &self,
        room: &Room,
        human: &RoomMessage,
        drafts: &[(String, String)],
    ) -> Vec<Message> {
        let summary = non_empty(room.project_summary.as_deref()).unwrap_or(NO_PROJECT_SUMMARY);

        let mut messages = vec![
            Message::system(COORDINATOR_INSTRUCTIONS),
            Message::system(format!("CURRENT PROJECT SUMMARY:\n{}", summary)),
            latest_turn(human),
        ];
        messages.extend(
            drafts
                .iter()
                .map(|(name, text)| Message::assistant(format!("{} draft response:\n{}", name, text))),
        );
        messages
    }

    /// Prompt for a question answered from shared memory only
    #[must_use]
    pub fn build_memory_query(context: &str, asker: &str, question: &str) -> Vec<Message> {
        let context = if context.trim().is_empty() {
            EMPTY_MEMORY
        } else {
            context
        };
        vec![
            Message::system(MEMORY_INSTRUCTIONS),
            Message::system(format!("MEMORY CONTEXT:\n{}", context)),
            Message::user(format!("{} asks: {}", asker, question)),
        ]
    }

    /// Memory summary followed by timestamped notes, oldest first
    #[must_use]
    pub fn memory_context(summary: Option<&str>, notes: &[MemoryRecord]) -> String {
        let lines = notes
            .iter()
            .map(|n| format!("[{}] {}", n.created_at.format("%Y-%m-%dT%H:%M:%S"), n.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n\n{}", summary.unwrap_or_default(), lines)
            .trim()
            .to_string()
    }
}

fn identity_block(agent: &AgentProfile, persona: Option<&AgentPersona>, mode: AskMode) -> String {
    let mut out = format!("You are {} ({}).", agent.name, agent.speciality);
    if !agent.description.is_empty() {
        out.push(' ');
        out.push_str(&agent.description);
    }

    if let Some(persona) = persona.filter(|p| !p.attributes.is_empty()) {
        out.push_str("\nPersona:");
        for (key, value) in &persona.attributes {
            let _ = write!(out, "\n- {}: {}", key, value);
        }
    }

    if mode == AskMode::Team {
        out.push_str("\nThis is a team question. Provide your perspective as a draft for the coordinator.");
    }
    out
}

fn replay(message: &RoomMessage) -> Message {
    Message::new(
        message.role.llm_role(),
        format!("{}: {}", message.sender_name, message.content),
    )
}

fn latest_turn(human: &RoomMessage) -> Message {
    Message::user(format!(
        "Latest human message from {}:\n{}",
        human.sender_name, human.content
    ))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
