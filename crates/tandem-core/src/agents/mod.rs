//! Agent roster
//!
//! The roster is fixed at startup: an ordered list of teammates plus one
//! coordinator. Registry order is the priority order for summary directives.
//!
//! ```text
//!   yug ─┐
//!  sean ─┤  drafts (parallel)
//! severin┤ ──────────────────▶ coordinator ──▶ final answer
//!  nayab ─┘
//! ```

mod config;
mod registry;

pub use config::{default_coordinator, default_teammates, AgentDefinition};
pub use registry::{AgentProfile, AgentRegistry};
