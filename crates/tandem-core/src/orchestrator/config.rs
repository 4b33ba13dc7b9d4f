//! Orchestrator configuration

use crate::prompt::{DEFAULT_HISTORY_WINDOW, DEFAULT_HISTORY_WINDOW_WITH_MEMORY};
use crate::security::DEFAULT_MAX_CHARS;
use serde::{Deserialize, Serialize};

/// Orchestrator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Agent used by single-target modes when none is named
    #[serde(default = "default_agent")]
    pub default_agent: String,
    /// Length ceiling for human input
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    /// Ledger messages replayed without a memory excerpt
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Ledger messages replayed with a memory excerpt
    #[serde(default = "default_history_window_with_memory")]
    pub history_window_with_memory: usize,
    /// Memory notes injected into agent prompts (0 disables)
    #[serde(default = "default_memory_excerpt_size")]
    pub memory_excerpt_size: usize,
    /// Notes considered when answering a memory question
    #[serde(default = "default_memory_query_window")]
    pub memory_query_window: usize,
    /// Notes returned by the memory view
    #[serde(default = "default_memory_view_notes")]
    pub memory_view_notes: usize,
    /// Temperature of teammate drafts in team mode
    #[serde(default = "default_team_temperature")]
    pub team_temperature: f32,
    /// Temperature of the coordinator's synthesis
    #[serde(default = "default_coordinator_temperature")]
    pub coordinator_temperature: f32,
    /// Temperature of memory questions
    #[serde(default = "default_memory_query_temperature")]
    pub memory_query_temperature: f32,
    /// Per-call completion timeout in seconds
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout_secs: u64,
}

fn default_agent() -> String {
    "yug".to_string()
}

fn default_max_content_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_history_window_with_memory() -> usize {
    DEFAULT_HISTORY_WINDOW_WITH_MEMORY
}

fn default_memory_excerpt_size() -> usize {
    5
}

fn default_memory_query_window() -> usize {
    200
}

fn default_memory_view_notes() -> usize {
    20
}

fn default_team_temperature() -> f32 {
    0.4
}

fn default_coordinator_temperature() -> f32 {
    0.35
}

fn default_memory_query_temperature() -> f32 {
    0.2
}

fn default_agent_timeout_secs() -> u64 {
    60
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_agent: default_agent(),
            max_content_chars: default_max_content_chars(),
            history_window: default_history_window(),
            history_window_with_memory: default_history_window_with_memory(),
            memory_excerpt_size: default_memory_excerpt_size(),
            memory_query_window: default_memory_query_window(),
            memory_view_notes: default_memory_view_notes(),
            team_temperature: default_team_temperature(),
            coordinator_temperature: default_coordinator_temperature(),
            memory_query_temperature: default_memory_query_temperature(),
            agent_timeout_secs: default_agent_timeout_secs(),
        }
    }
}
