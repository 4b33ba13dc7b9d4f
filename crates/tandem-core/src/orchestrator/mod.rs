//! Fan-out/synthesis orchestrator
//!
//! Turns a human message into agent replies and one atomic update of room
//! state. Writes produced by agents are staged in a [`CommitBatch`] and only
//! reach the store once the run commits; a failed run leaves the human
//! message in the ledger and nothing else.
//!
//! [`CommitBatch`]: crate::store::CommitBatch

mod config;
mod engine;
mod run;
mod types;

pub use config::OrchestratorConfig;
pub use engine::Orchestrator;
pub use types::{AgentInfo, AskMode, AskRequest, MemoryAnswer, RunState};

#[cfg(test)]
mod tests;
