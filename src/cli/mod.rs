//! CLI module for causeway
//!
//! Provides command-line interface for:
//! - check-config: Validate a tracker config file
//! - simulate: Run the reference world and report metrics

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, run, run_command, run_simulation, simulate};
pub use errors::{CliError, CliErrorCode, CliResult};
