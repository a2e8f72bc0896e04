//! CLI definitions for cronhook.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// cronhook CLI.
#[derive(Parser)]
#[command(name = "cronhook")]
#[command(about = "Persisted cron jobs that fire HTTP triggers")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "config/default.toml",
        env = "CRONHOOK_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the scheduler and API server in foreground (default)
    Run {
        /// Server host, overrides [server].host
        #[arg(long)]
        host: Option<String>,

        /// Server port, overrides [server].port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the configuration and print the effective settings
    CheckConfig,
}
