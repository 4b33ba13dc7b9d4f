//! Caller identity extractor
//!
//! Reads `x-user-id` and `x-org-id` headers and the peer address. Identity
//! is taken as given; authentication happens in front of this service.

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use tandem_core::Caller;

/// Header carrying the user id
pub const USER_HEADER: &str = "x-user-id";
/// Header carrying the organization id
pub const ORG_HEADER: &str = "x-org-id";

/// Extracted caller identity
pub struct CallerIdentity(pub Caller);

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(CallerIdentity(Caller {
            user_id: header(parts, USER_HEADER),
            org_id: header(parts, ORG_HEADER),
            remote_addr,
        }))
    }
}
