//! Security Module
//!
//! Content checks applied to human input before any agent sees it:
//! - Length ceiling
//! - Moderation deny-list
//! - Prompt-injection phrase detection

pub mod guard;

pub use guard::{
    default_deny_terms, ContentGuard, GuardConfig, InjectionPattern, DANGEROUS_PATTERNS,
    DEFAULT_DENY_TERMS, DEFAULT_MAX_CHARS,
};
