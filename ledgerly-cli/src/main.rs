//! Main entry point for the Ledgerly CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use shared::config::Config;
use std::path::PathBuf;

mod commands;
mod telemetry;

use commands::session::SessionCommand;

/// Ledgerly CLI
#[derive(Parser)]
#[command(name = "ledgerly")]
#[command(about = "Command-line interface for Ledgerly", long_about = None)]
struct Cli {
    /// Path to the configuration file (yaml, yml, json or toml)
    #[arg(
        long,
        short,
        global = true,
        help = "Path to the configuration file (e.g., config.yaml). If not provided, defaults and LEDGERLY_* variables are used."
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the Ledgerly CLI
#[derive(Subcommand)]
enum Commands {
    /// Sign in, inspect or end the stored session
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)
        #[arg(
            long,
            short,
            help = "The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)"
        )]
        shell: clap_complete::Shell,
    },

    /// Generate a configuration file
    Config {
        /// Format of the configuration file to generate (yaml, json or toml). Defaults to yaml.
        #[arg(
            long,
            short,
            help = "Format of the configuration file to generate (yaml, json or toml). Defaults to yaml."
        )]
        format: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Session { command } => {
            let config = Config::load_config(cli.config)?;
            telemetry::initialize_tracing(&config.logging);
            commands::session::run(command, &config).await?;
        }
        Commands::Completion { shell } => {
            commands::completion::generate_completion(shell);
        }
        Commands::Config { format } => {
            let format = format.unwrap_or_else(|| "yaml".to_string());
            commands::config::generate_config(&format)?;
        }
    }

    Ok(())
}
