//! Tandem server
//!
//! HTTP surface, configuration and startup around `tandem-core`.

#![forbid(unsafe_code)]

pub mod api;
pub mod cli;
pub mod server;
