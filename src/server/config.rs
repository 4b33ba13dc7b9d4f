//! Server configuration types
//!
//! Every section deserializes with defaults so a partial TOML file or a
//! handful of `TANDEM_*` variables is enough to start.

use serde::{Deserialize, Serialize};
use tandem_core::agents::{default_coordinator, default_teammates};
use tandem_core::security::default_deny_terms;
use tandem_core::{AgentDefinition, OrchestratorConfig, RateLimitConfig, StoreBackend};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default = "default_teammates")]
    pub agents: Vec<AgentDefinition>,
    #[serde(default = "default_coordinator")]
    pub coordinator: AgentDefinition,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            llm: LlmConfig::default(),
            agents: default_teammates(),
            coordinator: default_coordinator(),
            orchestrator: OrchestratorConfig::default(),
            rate_limit: RateLimitConfig::default(),
            events: EventsConfig::default(),
            moderation: ModerationConfig::default(),
        }
    }
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Room state storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// SQLite database file
    #[serde(default = "default_sqlite_path")]
    pub path: String,
}

fn default_sqlite_path() -> String {
    "data/tandem.db".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_sqlite_path(),
        }
    }
}

/// Completion channel settings shared by every agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `openai` for the OpenAI-compatible API, `mock` for canned replies
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl LlmConfig {
    /// True when agents answer from the in-process mock
    pub fn is_mock(&self) -> bool {
        self.provider.eq_ignore_ascii_case("mock")
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Live event stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Queue capacity per subscriber
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Seconds between SSE keep-alive comments
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

fn default_capacity() -> usize {
    tandem_core::event_bus::DEFAULT_CAPACITY
}

fn default_keep_alive_secs() -> u64 {
    15
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

/// Content moderation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Case-insensitive terms that reject a message; empty disables the list
    #[serde(default = "default_deny_terms")]
    pub deny_terms: Vec<String>,
    #[serde(default = "default_true")]
    pub block_injection: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            deny_terms: default_deny_terms(),
            block_injection: true,
        }
    }
}
