//! Rendering of command results

use std::io::{self, Write};

use clap::ValueEnum;
use serde_json::json;
use tether_exec::ExecOutput;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Remote stdout/stderr passed through, errors on stderr
    Text,
    /// One JSON object per command
    Json,
}

/// JSON form of one result; `error` is present only on failure
pub fn to_json(command: &str, output: &ExecOutput) -> serde_json::Value {
    let mut value = json!({
        "command": command,
        "stdout": output.stdout,
        "stderr": output.stderr,
    });
    if let Some(e) = output.error() {
        value["error"] = json!(e.to_string());
        if let Some(status) = output.exit_status() {
            value["status"] = json!(status);
        }
    }
    value
}

/// Write one result in `format`
///
/// # Errors
/// Returns I/O errors from the underlying writers
pub fn write_output(
    format: OutputFormat,
    command: &str,
    output: &ExecOutput,
    out: &mut impl Write,
    err: &mut impl Write,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => {
            out.write_all(output.stdout.as_bytes())?;
            err.write_all(output.stderr.as_bytes())?;
            if let Some(e) = output.error() {
                writeln!(err, "tether: {command}: {e}")?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", to_json(command, output))?;
        }
    }
    Ok(())
}
