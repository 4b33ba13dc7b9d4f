//! Utility modules for tandem-core
//!
//! - rate_limiter: per-key sliding-window request admission

mod rate_limiter;

pub use rate_limiter::{RateLimitConfig, RateLimitResult, RateLimiter};
