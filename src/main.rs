//! cronhook - persisted cron jobs that fire HTTP triggers.
//!
//! Main entry point for the cronhook CLI and server.

mod cli;
mod server;
mod signal;

use clap::Parser;

use cronhook_config::{ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands};
use crate::server::{init_tracing, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = ConfigLoader::load_or_default(&cli.config)?;

    match cli.command {
        None => {
            init_tracing(&config.logging)?;
            run_server(config).await
        }
        Some(Commands::Run { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            init_tracing(&config.logging)?;
            run_server(config).await
        }
        Some(Commands::CheckConfig) => {
            let result = ConfigValidator::validate(&config);
            for warning in &result.warnings {
                println!("warning: {}: {}", warning.path, warning.message);
            }
            for error in &result.errors {
                println!("error: {}", error);
            }
            println!("{}", toml::to_string_pretty(&config)?);
            if !result.is_valid() {
                anyhow::bail!("configuration has {} error(s)", result.errors.len());
            }
            Ok(())
        }
    }
}
