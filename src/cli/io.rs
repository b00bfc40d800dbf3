//! JSON output for CLI commands
//!
//! Each command prints exactly one JSON object on its own line. Log lines
//! from the tracker share stdout; consumers key on `status`.

use std::io::{self, Write};

use serde_json::{json, Value};

use super::errors::CliResult;

/// `{"status":"ok","data":...}`
pub fn write_response(data: Value) -> CliResult<()> {
    emit(&json!({ "status": "ok", "data": data }))
}

/// `{"status":"error","code":...,"message":...}`
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    emit(&json!({ "status": "error", "code": code, "message": message }))
}

fn emit(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
