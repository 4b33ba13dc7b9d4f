//! Completion channel resolution
//!
//! Every agent gets its own channel so each can carry its own credential.

use super::config::LlmConfig;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tandem_core::{AgentDefinition, AgentRegistry, Error};
use tandem_llm::{MockProvider, OpenAiCompatConfig, OpenAiCompatProvider, SharedProvider};
use tracing::{debug, info};

/// Build one channel per agent
///
/// With `provider = "mock"` no credentials are needed; otherwise a missing
/// key is a startup error naming the variable.
pub fn resolve_channel(llm: &LlmConfig, def: &AgentDefinition) -> tandem_core::Result<SharedProvider> {
    if llm.is_mock() {
        debug!(agent = %def.id, "Using mock channel");
        return Ok(Arc::new(MockProvider::new(def.id.clone())));
    }

    let config = OpenAiCompatConfig::from_env(def.id.clone(), &def.api_key_env)
        .map_err(|e| Error::Configuration(format!("agent '{}': {}", def.id, e)))?
        .with_base_url(llm.base_url.clone())
        .with_model(llm.model.clone())
        .with_timeout(Duration::from_secs(llm.timeout_secs));

    let provider = OpenAiCompatProvider::new(config)
        .map_err(|e| Error::Configuration(format!("agent '{}': {}", def.id, e)))?;
    debug!(agent = %def.id, key_env = %def.api_key_env, "Channel configured");
    Ok(Arc::new(provider))
}

/// Build the agent registry from configuration
pub fn build_registry(
    llm: &LlmConfig,
    agents: &[AgentDefinition],
    coordinator: &AgentDefinition,
    default_agent: &str,
) -> Result<AgentRegistry> {
    let registry = AgentRegistry::from_definitions(agents, coordinator, default_agent, &llm.model, |def| {
        resolve_channel(llm, def)
    })
    .context("Failed to build agent registry")?;

    info!(
        provider = %llm.provider,
        model = %llm.model,
        teammates = registry.teammates().len(),
        "Agents registered"
    );
    Ok(registry)
}
