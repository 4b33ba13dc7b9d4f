//! Agent definitions as read from configuration

use serde::{Deserialize, Serialize};

/// One agent as declared in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique agent identifier (e.g. "yug")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Persona text
    #[serde(default)]
    pub description: String,
    /// Domain line shown in the team roster
    #[serde(default)]
    pub speciality: String,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: String,
    /// Model override (defaults to the `[llm]` model)
    #[serde(default)]
    pub model: Option<String>,
    /// Temperature for single-agent calls
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.35
}

impl AgentDefinition {
    fn new(id: &str, name: &str, speciality: &str, description: &str, key_env: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            speciality: speciality.to_string(),
            api_key_env: key_env.to_string(),
            model: None,
            temperature: default_temperature(),
        }
    }
}

/// Default teammates, in priority order
#[must_use]
pub fn default_teammates() -> Vec<AgentDefinition> {
    vec![
        AgentDefinition::new(
            "yug",
            "Yug",
            "Frontend",
            "Frontend engineer. Thinks in components, state and user flows.",
            "OPENAI_API_KEY_A",
        ),
        AgentDefinition::new(
            "sean",
            "Sean",
            "Backend",
            "Backend engineer. Cares about APIs, data models and reliability.",
            "OPENAI_API_KEY_B",
        ),
        AgentDefinition::new(
            "severin",
            "Severin",
            "Full stack/PM",
            "Full-stack engineer and project manager. Tracks scope and deadlines.",
            "OPENAI_API_KEY_C",
        ),
        AgentDefinition::new(
            "nayab",
            "Nayab",
            "Coordination & Infra",
            "Infrastructure and coordination. Owns deploys, CI and cross-team handoffs.",
            "OPENAI_API_KEY_D",
        ),
    ]
}

/// Default coordinator; shares the fourth teammate's key
#[must_use]
pub fn default_coordinator() -> AgentDefinition {
    AgentDefinition::new(
        "coordinator",
        "Coordinator",
        "Synthesis",
        "Coordinator. Merges the team's drafts into one clear answer.",
        "OPENAI_API_KEY_D",
    )
}
