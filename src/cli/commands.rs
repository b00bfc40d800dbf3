//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use serde_json::json;

use crate::observability::{LogEvent, Logger, TrackerMetrics};
use crate::sim::{install_sample_listeners, SimWorld, TickReport};
use crate::tracker::TrackerConfig;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(err) = &result {
        // Best effort: the error is also returned for the exit code.
        let _ = write_error(err.code_str(), err.message());
    }
    result
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::CheckConfig { config } => check_config(&config),
        Command::Simulate { config, ticks } => simulate(config.as_deref(), ticks),
    }
}

fn load_config(path: &Path) -> CliResult<TrackerConfig> {
    let config = TrackerConfig::load(path)?;
    let display = path.display().to_string();
    Logger::event(LogEvent::ConfigLoaded, &[("path", &display)]);
    Ok(config)
}

/// Validate a config file and print the effective settings
pub fn check_config(path: &Path) -> CliResult<()> {
    let config = load_config(path)?;
    write_response(serde_json::to_value(&config)?)
}

/// Drive the reference world for `ticks` ticks with the sample listeners
pub fn simulate(path: Option<&Path>, ticks: u64) -> CliResult<()> {
    let config = match path {
        Some(path) => load_config(path)?,
        None => TrackerConfig::default(),
    };
    let reports = run_simulation(config, ticks)?;
    write_response(json!({
        "ticks": ticks,
        "reports": reports.0,
        "metrics": reports.1,
    }))
}

/// Run the simulation and return per-tick reports plus final metrics
pub fn run_simulation(
    config: TrackerConfig,
    ticks: u64,
) -> CliResult<(Vec<TickReport>, crate::observability::MetricsSnapshot)> {
    if ticks == 0 {
        return Err(CliError::config_error("ticks must be > 0"));
    }

    let metrics = Arc::new(TrackerMetrics::new());
    let mut world = SimWorld::new(config, metrics.clone());
    install_sample_listeners(world.events())?;
    world.seed_demo();

    let mut reports = Vec::with_capacity(ticks as usize);
    for _ in 0..ticks {
        reports.push(world.tick()?);
    }
    Ok((reports, metrics.snapshot()))
}
