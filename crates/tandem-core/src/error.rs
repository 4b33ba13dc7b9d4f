//! Error types for tandem-core
//!
//! This module provides the error taxonomy shared by the orchestrator, the
//! store and the HTTP surface, plus user-facing error formatting.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Room, task or persona absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller belongs to another organization
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Moderation or prompt-injection match
    #[error("content rejected: {0}")]
    ContentRejected(String),

    /// Content exceeds the length ceiling
    #[error("content too large: {actual} characters (max {max})")]
    TooLarge {
        /// Characters received
        actual: usize,
        /// Configured ceiling
        max: usize,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded")]
    RateLimited {
        /// Seconds until retry is allowed
        retry_after: u64,
    },

    /// Agent id outside the configured roster
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// Completion channel failure
    #[error("upstream error: {0}")]
    Upstream(#[from] tandem_llm::Error),

    /// Store failure
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error (invalid settings, missing credentials)
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Stable machine-readable code for API bodies
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Forbidden(_) => "forbidden",
            Error::ContentRejected(_) => "content_rejected",
            Error::TooLarge { .. } => "too_large",
            Error::RateLimited { .. } => "rate_limited",
            Error::UnknownAgent(_) => "unknown_agent",
            Error::Upstream(_) => "upstream_error",
            Error::Store(_) => "store_error",
            Error::Configuration(_) => "configuration_error",
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for user-friendly error messages
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get a suggestion for how to fix the error
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Error {
    fn user_message(&self) -> String {
        match self {
            Error::NotFound(what) => format!("{} was not found.", what),
            Error::Forbidden(_) => "You do not have access to this room.".to_string(),
            Error::ContentRejected(_) => {
                "The message was rejected by the content policy.".to_string()
            }
            Error::TooLarge { max, .. } => {
                format!("The message is too long (limit is {} characters).", max)
            }
            Error::RateLimited { retry_after } => {
                format!("Rate limit exceeded. Please wait {} seconds.", retry_after)
            }
            Error::UnknownAgent(id) => format!("There is no agent called '{}'.", id),
            // Provider detail is already sanitized in tandem-llm
            Error::Upstream(e) => format!("An agent could not be reached: {}", e),
            Error::Store(_) => "Internal storage error.".to_string(),
            Error::Configuration(msg) => format!("Configuration error: {}", msg),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Error::TooLarge { .. } => Some("Split the message into smaller parts.".to_string()),
            Error::RateLimited { .. } => Some("Wait before sending another message.".to_string()),
            Error::UnknownAgent(_) => {
                Some("Use one of the agents listed by GET /api/v1/agents.".to_string())
            }
            Error::Upstream(_) => Some("Try again in a moment.".to_string()),
            Error::Configuration(_) => {
                Some("Check config/default.toml or the TANDEM_* environment variables.".to_string())
            }
            _ => None,
        }
    }
}
