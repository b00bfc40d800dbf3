//! Tracker configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};

/// Upper bound accepted for `max_phase_depth`
pub const MAX_PHASE_DEPTH_LIMIT: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    /// Trace every push and pop; dump the phase stack on fatal errors
    #[serde(default)]
    pub verbose: bool,

    /// Pushing a phase beyond this depth is a fatal runaway
    #[serde(default = "default_max_phase_depth")]
    pub max_phase_depth: usize,

    /// Missed captures logged before going quiet (counting continues)
    #[serde(default = "default_max_missed_capture_reports")]
    pub max_missed_capture_reports: usize,

    /// Dropping a guard on a fatal condition panics
    #[serde(default = "default_panic_on_fatal")]
    pub panic_on_fatal: bool,
}

fn default_max_phase_depth() -> usize {
    64
}

fn default_max_missed_capture_reports() -> usize {
    16
}

fn default_panic_on_fatal() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            max_phase_depth: default_max_phase_depth(),
            max_missed_capture_reports: default_max_missed_capture_reports(),
            panic_on_fatal: default_panic_on_fatal(),
        }
    }
}

impl TrackerConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate a JSON document
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: TrackerConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_phase_depth == 0 {
            return Err(ConfigError::Invalid("max_phase_depth must be > 0".into()));
        }
        if self.max_phase_depth > MAX_PHASE_DEPTH_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_phase_depth must be <= {}, got {}",
                MAX_PHASE_DEPTH_LIMIT, self.max_phase_depth
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert!(!config.verbose);
        assert_eq!(config.max_phase_depth, 64);
        assert_eq!(config.max_missed_capture_reports, 16);
        assert!(config.panic_on_fatal);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        assert_eq!(TrackerConfig::from_json("{}").unwrap(), TrackerConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = TrackerConfig::from_json(r#"{"verbose": true, "max_phase_depth": 8}"#).unwrap();
        assert!(config.verbose);
        assert_eq!(config.max_phase_depth, 8);
        assert!(config.panic_on_fatal);
    }

    #[test]
    fn test_zero_depth_rejected() {
        let err = TrackerConfig::from_json(r#"{"max_phase_depth": 0}"#).unwrap_err();
        assert_eq!(err.code(), "CAUSEWAY_CONFIG_INVALID");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = TrackerConfig::from_json(r#"{"max_depth": 3}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"max_missed_capture_reports": 2}}"#).unwrap();

        let config = TrackerConfig::load(file.path()).unwrap();
        assert_eq!(config.max_missed_capture_reports, 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TrackerConfig::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
