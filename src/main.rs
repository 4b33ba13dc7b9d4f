//! Tandem - shared rooms with a team of AI agents
//!
//! CLI entry point for the Tandem server.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tandem::cli;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "tandem=info,tandem_core=info,tandem_llm=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = cli::Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if dotenv.is_err() {
        warn!(".env file not found; relying on the process environment");
    }

    cli::run(cli).await
}
