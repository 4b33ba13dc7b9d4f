//! Rate limiting for request throttling
//!
//! Sliding-window limiter keyed by caller (`user:<id>` or `ip:<addr>`).
//! Eviction, check and record for one key happen under a single write lock.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Rate limiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether admission is enforced at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum requests allowed in the window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    30
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Create a new rate limit config
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            enabled: true,
            max_requests,
            window_secs: window.as_secs().max(1),
        }
    }

    /// Create config for requests per minute
    #[must_use]
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Window as a duration
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Remaining requests in the current window
    pub remaining: u32,
    /// Time until the oldest request leaves the window
    pub reset_after: Duration,
    /// Requests counted in the window, this one included when allowed
    pub current: u32,
}

impl RateLimitResult {
    /// Whole seconds to wait before retrying, never zero for a denial
    #[must_use]
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs.max(1)
        }
    }
}

/// In-memory rate limiter using a sliding window
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    /// Map of key -> request timestamps, oldest first
    requests: Arc<RwLock<HashMap<String, VecDeque<Instant>>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit and record a request, or deny it
    pub async fn acquire(&self, key: &str) -> RateLimitResult {
        let window = self.config.window();
        let max = self.config.max_requests;

        if !self.config.enabled {
            return RateLimitResult {
                allowed: true,
                remaining: max,
                reset_after: Duration::ZERO,
                current: 0,
            };
        }

        let now = Instant::now();
        let mut requests = self.requests.write().await;
        let records = requests.entry(key.to_string()).or_default();

        evict(records, now, window);

        if records.len() as u32 >= max {
            let reset_after = reset_after(records, now, window);
            debug!(key = %key, current = records.len(), "Rate limit denied");
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_after,
                current: max,
            };
        }

        records.push_back(now);
        let current = records.len() as u32;

        RateLimitResult {
            allowed: true,
            remaining: max.saturating_sub(current),
            reset_after: reset_after(records, now, window),
            current,
        }
    }

    /// Get current usage for a key as `(current, max)`
    pub async fn usage(&self, key: &str) -> (u32, u32) {
        let now = Instant::now();
        let window = self.config.window();

        let requests = self.requests.read().await;
        let current = requests
            .get(key)
            .map(|records| {
                records
                    .iter()
                    .filter(|t| now.duration_since(**t) < window)
                    .count() as u32
            })
            .unwrap_or(0);

        (current, self.config.max_requests)
    }

    /// Reset rate limit for a key
    pub async fn reset(&self, key: &str) {
        let mut requests = self.requests.write().await;
        requests.remove(key);
    }

    /// Drop keys with no request inside the window; returns how many were removed
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let window = self.config.window();

        let mut requests = self.requests.write().await;
        let initial_count = requests.len();

        requests.retain(|_, records| {
            evict(records, now, window);
            !records.is_empty()
        });

        initial_count - requests.len()
    }
}

fn evict(records: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = records.front() {
        if now.duration_since(*oldest) >= window {
            records.pop_front();
        } else {
            break;
        }
    }
}

fn reset_after(records: &VecDeque<Instant>, now: Instant, window: Duration) -> Duration {
    records
        .front()
        .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
        .unwrap_or(Duration::ZERO)
}
