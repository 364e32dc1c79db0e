//! Subprocess bridge speaking a line-delimited JSON tool protocol.
//!
//! Each invocation spawns the configured command, writes one request line
//! (`{"tool": ..., "arguments": ...}`) to its stdin, and parses the last
//! JSON object line from stdout. This matches controller bridges that expose
//! `list_items` / `list_things` / `list_rules` tools over stdio.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::io::process::run_command_with_timeout;
use crate::io::settings::BridgeSettings;

const BRIDGE_TIMEOUT: Duration = Duration::from_secs(60);
const BRIDGE_OUTPUT_LIMIT: usize = 4_000_000;

/// Client for the stdio tool bridge.
pub struct BridgeClient {
    command: Vec<String>,
}

impl BridgeClient {
    pub fn new(settings: &BridgeSettings) -> Self {
        Self {
            command: settings.command.clone(),
        }
    }

    /// Invoke one tool and return its JSON result.
    pub fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value> {
        let request = json!({ "tool": tool, "arguments": arguments });
        let mut line = serde_json::to_string(&request).context("serialize bridge request")?;
        line.push('\n');

        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);
        debug!(tool, command = %self.command.join(" "), "invoking bridge tool");

        let output = run_command_with_timeout(
            cmd,
            Some(line.as_bytes()),
            BRIDGE_TIMEOUT,
            BRIDGE_OUTPUT_LIMIT,
        )
        .with_context(|| format!("run bridge command for tool {tool}"))?;

        if output.timed_out {
            return Err(anyhow!("bridge tool {tool} timed out after {BRIDGE_TIMEOUT:?}"));
        }
        if !output.status.success() {
            warn!(tool, exit_code = ?output.status.code(), "bridge command failed");
            return Err(anyhow!(
                "bridge tool {tool} failed with status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_last_json_line(&stdout)
            .ok_or_else(|| anyhow!("bridge tool {tool} did not return a JSON line"))
    }
}

/// Bridges may emit diagnostics before the payload; the result is the last
/// stdout line that parses as a JSON object or array.
fn parse_last_json_line(stdout: &str) -> Option<Value> {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{') || line.starts_with('['))
        .find_map(|line| serde_json::from_str(line).ok())
}
