//! Error types for tandem-llm

use thiserror::Error;

/// LLM error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Provider answered with a non-success status
    #[error("upstream error ({}): {detail}", status.map_or_else(|| "no status".to_string(), |s| s.to_string()))]
    Upstream {
        /// HTTP status returned by the provider, if any
        status: Option<u16>,
        /// Sanitized provider detail
        detail: String,
    },

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

impl Error {
    /// HTTP status associated with the failure, when the provider sent one
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_display_with_status() {
        let err = Error::Upstream {
            status: Some(503),
            detail: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "upstream error (503): overloaded");
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_upstream_display_without_status() {
        let err = Error::Upstream {
            status: None,
            detail: "connection reset".to_string(),
        };
        assert!(err.to_string().contains("no status"));
        assert_eq!(Error::Timeout(10).status(), None);
    }
}
