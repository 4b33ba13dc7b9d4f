//! OpenAI-compatible chat completion provider
//!
//! Talks to any endpoint exposing `POST {base_url}/chat/completions`, which
//! covers OpenAI itself and most hosted or self-hosted gateways.

use crate::completion::{CompletionRequest, CompletionResponse, TokenUsage};
use crate::error::{Error, Result};
use crate::message::Message;
use crate::provider::LlmProvider;
use crate::util::{mask_api_key, sanitize_api_error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Provider configuration
#[derive(Clone)]
pub struct OpenAiCompatConfig {
    /// Label used in logs (usually the owning agent id)
    pub label: String,
    /// API key
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Default model
    pub default_model: String,
    /// Request timeout
    pub timeout: Duration,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for OpenAiCompatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatConfig")
            .field("label", &self.label)
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiCompatConfig {
    /// Create a new configuration with an API key
    #[must_use]
    pub fn new(label: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Create configuration reading the key from the named environment variable
    pub fn from_env(label: impl Into<String>, key_var: &str) -> Result<Self> {
        let api_key = std::env::var(key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::NotConfigured(format!("{key_var} not set")))?;
        Ok(Self::new(label, api_key))
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI-compatible provider
pub struct OpenAiCompatProvider {
    client: Client,
    config: OpenAiCompatConfig,
}

impl fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
    #[serde(default)]
    model: String,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAiCompatProvider {
    /// Create a new provider
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::NotConfigured(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Provider configuration
    #[must_use]
    pub fn config(&self) -> &OpenAiCompatConfig {
        &self.config
    }

    fn convert_message(msg: &Message) -> ChatMessage {
        ChatMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        let model = if request.model.is_empty() {
            &self.config.default_model
        } else {
            &request.model
        };

        ChatRequest {
            model: model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }

    fn parse_response(chat_response: ChatResponse) -> Result<CompletionResponse> {
        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("No choices in response".to_string()))?;

        let usage = chat_response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            content: choice.message.content.unwrap_or_default(),
            usage,
            finish_reason: choice.finish_reason,
            model: chat_response.model,
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.label
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }

    #[instrument(skip(self, request), fields(provider = %self.config.label, model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let chat_request = self.build_request(&request);

        debug!(messages = chat_request.messages.len(), "Sending chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    Error::Network(sanitize_api_error(&e.to_string()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Provider returned error status");
            return Err(Error::Upstream {
                status: Some(status.as_u16()),
                detail: sanitize_api_error(&error_text),
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        Self::parse_response(chat_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OpenAiCompatConfig::new("yug", "test-key")
            .with_base_url("http://localhost:8080/v1/")
            .with_model("gpt-4.1")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.label, "yug");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.default_model, "gpt-4.1");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_debug_masks_key() {
        let config = OpenAiCompatConfig::new("sean", "sk-1234567890abcdefghijklmnop");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("1234567890abcdefghijkl"));
        assert!(debug_str.contains("sk-1...mnop"));
    }

    #[test]
    fn test_from_env_missing_key() {
        let err = OpenAiCompatConfig::from_env("x", "TANDEM_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(err, Error::NotConfigured(_)));
    }

    #[test]
    fn test_build_request_uses_default_model() {
        let provider = OpenAiCompatProvider::new(OpenAiCompatConfig::new("yug", "k")).unwrap();
        let request = CompletionRequest::new("")
            .with_messages(vec![Message::system("s"), Message::user("hi")])
            .with_temperature(0.4);

        let chat = provider.build_request(&request);
        assert_eq!(chat.model, DEFAULT_MODEL);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[1].role, "user");

        let json = serde_json::to_value(&chat).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!((json["temperature"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_parse_response() {
        let body = serde_json::json!({
            "model": "gpt-4.1-mini",
            "choices": [{"message": {"content": "hello"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        });
        let parsed: ChatResponse = serde_json::from_value(body).unwrap();
        let response = OpenAiCompatProvider::parse_response(parsed).unwrap();
        assert_eq!(response.content, "hello");
        assert_eq!(response.usage.unwrap().total_tokens, 4);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let parsed: ChatResponse =
            serde_json::from_value(serde_json::json!({"choices": []})).unwrap();
        assert!(matches!(
            OpenAiCompatProvider::parse_response(parsed),
            Err(Error::InvalidResponse(_))
        ));
    }
}
