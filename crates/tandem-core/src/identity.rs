//! Caller identity
//!
//! Identity is taken as given: the HTTP layer reads it from request headers.

use serde::{Deserialize, Serialize};

/// Organization used when the caller supplies none
pub const DEFAULT_ORG: &str = "default";

/// Identity of the party issuing a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// Authenticated user id, if any
    pub user_id: Option<String>,
    /// Organization id, if any
    pub org_id: Option<String>,
    /// Peer network address, if known
    pub remote_addr: Option<String>,
}

impl Caller {
    /// Caller identified by user id only
    #[must_use]
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Default::default()
        }
    }

    /// Set the organization
    #[must_use]
    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Set the peer address
    #[must_use]
    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Organization, falling back to the default one
    #[must_use]
    pub fn org(&self) -> &str {
        self.org_id.as_deref().unwrap_or(DEFAULT_ORG)
    }

    /// Key used for rate limiting: `user:<id>` when known, else `ip:<addr>`
    #[must_use]
    pub fn rate_limit_key(&self) -> String {
        match (&self.user_id, &self.remote_addr) {
            (Some(user), _) => format!("user:{}", user),
            (None, Some(addr)) => format!("ip:{}", addr),
            (None, None) => "ip:unknown".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_key_prefers_user() {
        let caller = Caller::user("u1").with_remote_addr("10.0.0.1");
        assert_eq!(caller.rate_limit_key(), "user:u1");

        let anon = Caller::default().with_remote_addr("10.0.0.1");
        assert_eq!(anon.rate_limit_key(), "ip:10.0.0.1");
        assert_eq!(Caller::default().rate_limit_key(), "ip:unknown");
    }

    #[test]
    fn test_org_default() {
        assert_eq!(Caller::user("u").org(), "default");
        assert_eq!(Caller::user("u").with_org("acme").org(), "acme");
    }
}
