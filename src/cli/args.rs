//! CLI argument definitions using clap
//!
//! Commands:
//! - causeway check-config --config <path>
//! - causeway simulate [--config <path>] [--ticks <n>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// causeway - cause tracking and phase transactions for a simulation tick
#[derive(Parser, Debug)]
#[command(name = "causeway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate a tracker config file and print the effective settings
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./causeway.json")]
        config: PathBuf,
    },

    /// Run the reference world for a number of ticks and print metrics
    Simulate {
        /// Path to configuration file; defaults apply when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of ticks to run
        #[arg(long, default_value_t = 10)]
        ticks: u64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
