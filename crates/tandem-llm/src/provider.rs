//! LLM Provider trait definition
//!
//! Every agent reaches its model through one `LlmProvider`. Agents may share a
//! provider instance when they share a credential.

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::error::Result;
use std::sync::Arc;

/// Trait for LLM providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Complete a conversation (text only)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Shared provider handle
pub type SharedProvider = Arc<dyn LlmProvider>;
