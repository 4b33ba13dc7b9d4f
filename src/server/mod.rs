//! Server module for Tandem
//!
//! - `config`: configuration structures for every server component
//! - `loader`: configuration loading from files and environment
//! - `providers`: per-agent completion channels
//! - `init`: store, orchestrator and HTTP server startup

pub mod config;
mod init;
mod loader;
mod providers;

pub use init::{build_orchestrator, run, ServeOptions};
pub use loader::{load_config, profile};
pub use providers::build_registry;
