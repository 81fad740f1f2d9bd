//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use vaultsync_core::Resolution;

/// vaultsync - Bidirectional sync between documents and a Markdown vault
#[derive(Parser, Debug)]
#[command(name = "vaultsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(
        short,
        long,
        global = true,
        env = "VAULTSYNC_CONFIG",
        default_value = "config.yaml"
    )]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Sync documents and vault files
    ///
    /// Polls until interrupted unless --once is given. With --once the exit
    /// status is 2 if any mapping ended in an error or a conflict.
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,

        /// Seconds between cycles, overriding the configuration
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,

        /// Print the cycle report as JSON (with --once)
        #[arg(long, requires = "once")]
        json: bool,
    },

    /// Show tracked mappings and the last run
    Status {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List logged conflicts with resolution suggestions
    Conflicts {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Settle a conflict by keeping one side
    ///
    /// The next sync cycle copies the kept side over the other one.
    Resolve {
        /// Vault path of the conflicting mapping
        target: String,

        /// Side whose content wins
        #[arg(long, value_enum)]
        keep: KeepSide,
    },
}

/// Side kept by `resolve`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepSide {
    /// Keep the document version
    Doc,
    /// Keep the vault file version
    File,
}

impl From<KeepSide> for Resolution {
    fn from(side: KeepSide) -> Self {
        match side {
            KeepSide::Doc => Resolution::KeepDocument,
            KeepSide::File => Resolution::KeepFile,
        }
    }
}
