//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, then `severity`, then fields sorted by key
//! - Synchronous, no buffering
//! - TRACE/INFO/WARN go to stdout, ERROR/FATAL to stderr

use std::fmt;
use std::io::{self, Write};

use super::events::LogEvent;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Push/pop chatter, only emitted in verbose mode
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable gaps (missed captures)
    Warn = 2,
    /// Isolated failures (listeners, sync, rejected threads)
    Error = 3,
    /// Stack discipline violated; state is no longer trustworthy
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn to_stderr(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured logger that outputs one JSON object per line
pub struct Logger;

impl Logger {
    /// Log a raw event name with the given severity and fields
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity.to_stderr() {
            Self::log_to_writer(severity, event, fields, &mut io::stderr());
        } else {
            Self::log_to_writer(severity, event, fields, &mut io::stdout());
        }
    }

    /// Log a typed event at its default severity
    pub fn event(event: LogEvent, fields: &[(&str, &str)]) {
        Self::log(event.severity(), event.as_str(), fields);
    }

    /// Free-form event at INFO, for host-defined event names
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Free-form event at FATAL
    pub fn fatal(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Fatal, event, fields);
    }

    fn log_to_writer<W: Write>(
        severity: Severity,
        event: &str,
        fields: &[(&str, &str)],
        writer: &mut W,
    ) {
        let line = render(severity, event, fields);
        // A failing log sink must never take the tick thread down with it.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// `event`, then `severity`, then fields by key. Later duplicates of a key
/// are kept; consumers see the last one.
fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
    sorted.sort_by_key(|(key, _)| *key);

    let mut line = String::with_capacity(64 + fields.len() * 32);
    line.push('{');
    push_pair(&mut line, "event", event);
    line.push(',');
    push_pair(&mut line, "severity", severity.as_str());
    for (key, value) in sorted {
        line.push(',');
        push_pair(&mut line, key, value);
    }
    line.push_str("}\n");
    line
}

fn push_pair(line: &mut String, key: &str, value: &str) {
    push_quoted(line, key);
    line.push(':');
    push_quoted(line, value);
}

fn push_quoted(line: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => line.push_str(&quoted),
        Err(_) => line.push_str("\"\""),
    }
}

#[cfg(test)]
pub fn capture_log(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut buffer = Vec::new();
    Logger::log_to_writer(severity, event, fields, &mut buffer);
    String::from_utf8(buffer).unwrap()
}
