//! Command line interface

use crate::server::{self, config::AppConfig, ServeOptions};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tandem_llm::util::mask_api_key;

/// Tandem shared-room agent server
#[derive(Parser, Debug)]
#[command(name = "tandem")]
#[command(about = "Shared rooms where a team of AI agents answers together")]
#[command(version)]
pub struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the server (default)
    Serve {
        /// Bind address (overrides [server].host)
        #[arg(long, env = "TANDEM_HOST")]
        host: Option<String>,
        /// Port (overrides [server].port)
        #[arg(long, env = "TANDEM_PORT")]
        port: Option<u16>,
    },
    /// Print the resolved configuration with credentials masked
    CheckConfig,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => server::run(ServeOptions { host, port }).await,
        Commands::CheckConfig => check_config(),
    }
}

fn check_config() -> Result<()> {
    let config = server::load_config()?;
    let rendered = toml::to_string_pretty(&config).context("Failed to render configuration")?;

    println!("# profile: {}", server::profile());
    println!("{}", rendered);
    println!("# credentials");
    for (id, var) in credential_vars(&config) {
        let status = match std::env::var(&var) {
            Ok(key) if !key.trim().is_empty() => mask_api_key(&key),
            _ if config.llm.is_mock() => "(not needed with mock provider)".to_string(),
            _ => "MISSING".to_string(),
        };
        println!("# {:<12} {:<20} {}", id, var, status);
    }
    Ok(())
}

fn credential_vars(config: &AppConfig) -> Vec<(String, String)> {
    config
        .agents
        .iter()
        .chain(std::iter::once(&config.coordinator))
        .map(|a| (a.id.clone(), a.api_key_env.clone()))
        .collect()
}
