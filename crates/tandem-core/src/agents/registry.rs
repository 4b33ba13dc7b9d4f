//! Agent registry

use super::config::AgentDefinition;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tandem_llm::SharedProvider;

/// A resolved agent: persona plus completion channel
#[derive(Clone)]
pub struct AgentProfile {
    /// Agent identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Persona text
    pub description: String,
    /// Domain line used in the roster
    pub speciality: String,
    /// Model name (empty = channel default)
    pub model: String,
    /// Temperature for single-agent calls
    pub temperature: f32,
    /// Completion channel
    pub channel: SharedProvider,
}

impl fmt::Debug for AgentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentProfile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("speciality", &self.speciality)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("channel", &self.channel.name())
            .finish()
    }
}

impl AgentProfile {
    /// Build a profile from its definition and channel
    #[must_use]
    pub fn from_definition(def: &AgentDefinition, default_model: &str, channel: SharedProvider) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            description: def.description.clone(),
            speciality: def.speciality.clone(),
            model: def.model.clone().unwrap_or_else(|| default_model.to_string()),
            temperature: def.temperature,
            channel,
        }
    }
}

/// Static mapping from agent id to profile
///
/// Built once at startup and shared behind `Arc`; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    teammates: Vec<Arc<AgentProfile>>,
    coordinator: Arc<AgentProfile>,
    default_agent: String,
}

impl AgentRegistry {
    /// Create a registry
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if there are no teammates, ids repeat, or the
    /// default agent is not a teammate.
    pub fn new(
        teammates: Vec<AgentProfile>,
        coordinator: AgentProfile,
        default_agent: impl Into<String>,
    ) -> Result<Self> {
        let default_agent = default_agent.into();

        if teammates.is_empty() {
            return Err(Error::Configuration("at least one teammate is required".to_string()));
        }

        let mut seen = HashSet::new();
        for id in teammates.iter().map(|t| &t.id).chain(std::iter::once(&coordinator.id)) {
            if !seen.insert(id.as_str()) {
                return Err(Error::Configuration(format!("duplicate agent id '{}'", id)));
            }
        }

        if !teammates.iter().any(|t| t.id == default_agent) {
            return Err(Error::Configuration(format!(
                "default agent '{}' is not a teammate",
                default_agent
            )));
        }

        Ok(Self {
            teammates: teammates.into_iter().map(Arc::new).collect(),
            coordinator: Arc::new(coordinator),
            default_agent,
        })
    }

    /// Build a registry from definitions, creating channels with `make_channel`
    pub fn from_definitions<F>(
        teammates: &[AgentDefinition],
        coordinator: &AgentDefinition,
        default_agent: &str,
        default_model: &str,
        mut make_channel: F,
    ) -> Result<Self>
    where
        F: FnMut(&AgentDefinition) -> Result<SharedProvider>,
    {
        let mut profiles = Vec::with_capacity(teammates.len());
        for def in teammates {
            let channel = make_channel(def)?;
            profiles.push(AgentProfile::from_definition(def, default_model, channel));
        }
        let coordinator_channel = make_channel(coordinator)?;
        let coordinator = AgentProfile::from_definition(coordinator, default_model, coordinator_channel);

        Self::new(profiles, coordinator, default_agent)
    }

    /// Resolve any agent, coordinator included
    ///
    /// # Errors
    ///
    /// Returns `UnknownAgent` for ids outside the roster.
    pub fn resolve(&self, agent_id: &str) -> Result<Arc<AgentProfile>> {
        if self.coordinator.id == agent_id {
            return Ok(Arc::clone(&self.coordinator));
        }
        self.teammates
            .iter()
            .find(|t| t.id == agent_id)
            .cloned()
            .ok_or_else(|| Error::UnknownAgent(agent_id.to_string()))
    }

    /// Teammates in priority order
    #[must_use]
    pub fn teammates(&self) -> &[Arc<AgentProfile>] {
        &self.teammates
    }

    /// The coordinator
    #[must_use]
    pub fn coordinator(&self) -> &Arc<AgentProfile> {
        &self.coordinator
    }

    /// Agent used by single-target modes when none is named
    #[must_use]
    pub fn default_agent(&self) -> &str {
        &self.default_agent
    }

    /// Every agent, teammates first
    pub fn all(&self) -> impl Iterator<Item = &Arc<AgentProfile>> {
        self.teammates.iter().chain(std::iter::once(&self.coordinator))
    }
}
