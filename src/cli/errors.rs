//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code.

use std::io;

use thiserror::Error;

use crate::event::EventError;
use crate::tracker::{ConfigError, PhaseError};

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file missing, malformed or invalid
    ConfigError,
    /// I/O error (stdout)
    IoError,
    /// The simulation hit a tracker or dispatch error
    SimulationFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "CAUSEWAY_CLI_CONFIG_ERROR",
            Self::IoError => "CAUSEWAY_CLI_IO_ERROR",
            Self::SimulationFailed => "CAUSEWAY_CLI_SIMULATION_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug, Error)]
#[error("{}: {message}", code.code())]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn simulation_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::SimulationFailed, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(format!("{} ({})", e, e.code()))
    }
}

impl From<PhaseError> for CliError {
    fn from(e: PhaseError) -> Self {
        Self::simulation_failed(format!("{} ({})", e, e.code()))
    }
}

impl From<EventError> for CliError {
    fn from(e: EventError) -> Self {
        Self::simulation_failed(format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
