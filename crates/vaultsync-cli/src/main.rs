//! vaultsync CLI
//!
//! Keeps word-processor documents and a plain-text vault in sync.

mod cli;
mod commands;
mod error;
mod logging;
mod signal;

use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::{CliError, Result};
use vaultsync_core::SyncConfig;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose).map_err(|e| CliError::user(format!("logging setup failed: {e}")))?;

    let Some(command) = cli.command else {
        println!("{} keeps documents and a vault in sync", "vaultsync".green().bold());
        println!();
        println!("Run {} for available commands.", "vaultsync --help".cyan());
        return Ok(ExitCode::SUCCESS);
    };

    let mut config = SyncConfig::load(Some(cli.config.as_path()))?;
    tracing::debug!(?config, "Configuration loaded");

    match command {
        Commands::Run {
            once,
            interval,
            json,
        } => {
            if let Some(secs) = interval {
                if secs == 0 {
                    return Err(CliError::user("--interval must be greater than zero"));
                }
                config.sync_interval = secs;
            }
            commands::run_sync(&config, once, json)
        }
        Commands::Status { json } => commands::run_status(&config, json).map(|()| ExitCode::SUCCESS),
        Commands::Conflicts { json } => {
            commands::run_conflicts(&config, json).map(|()| ExitCode::SUCCESS)
        }
        Commands::Resolve { target, keep } => {
            commands::run_resolve(&config, &target, keep.into()).map(|()| ExitCode::SUCCESS)
        }
    }
}
