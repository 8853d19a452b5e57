//! Bash tool: execute shell commands inside the session's working directory.
//!
//! A bare `cd <dir>` is handled in-process and moves the shared
//! [`WorkingDir`]; every other command runs under `sh -c` with a timeout.

use async_trait::async_trait;
use codeclaw_core::confirmation::{ConfirmationKind, ConfirmationRequest};
use codeclaw_core::error::ToolError;
use codeclaw_core::tool::{Tool, ToolContext, ToolResult};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::WorkingDir;

pub struct BashTool {
    workdir: WorkingDir,
    timeout_secs: u64,
}

impl BashTool {
    pub fn new(workdir: WorkingDir, timeout_secs: u64) -> Self {
        Self {
            workdir,
            timeout_secs,
        }
    }

    fn change_directory(&self, target: &str) -> ToolResult {
        let target = target.trim().trim_matches(|c| c == '"' || c == '\'');
        let destination = if target.is_empty() || target == "~" {
            match std::env::var_os("HOME") {
                Some(home) => home.into(),
                None => return ToolResult::err("Cannot change directory: HOME is not set"),
            }
        } else {
            self.workdir.resolve(target)
        };

        match std::fs::canonicalize(&destination) {
            Ok(path) if path.is_dir() => {
                let shown = path.display().to_string();
                self.workdir.set(path);
                ToolResult::ok(format!("Changed directory to: {shown}"))
            }
            Ok(_) => ToolResult::err(format!("Cannot change directory: {target} is not a directory")),
            Err(e) => ToolResult::err(format!("Cannot change directory: {e}")),
        }
    }
}

/// `Some(target)` when `command` is a lone `cd`.
fn parse_cd(command: &str) -> Option<&str> {
    let command = command.trim();
    if command == "cd" {
        return Some("");
    }
    let rest = command.strip_prefix("cd ")?;
    if rest.contains(['&', ';', '|']) {
        return None;
    }
    Some(rest)
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn description(&self) -> &str {
        "Execute a bash command"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to execute"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let command = arguments["command"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'command' argument".into()))?;

        if let Some(target) = parse_cd(command) {
            return Ok(self.change_directory(target));
        }

        let request = ConfirmationRequest::new(ConfirmationKind::Bash, "Run bash command")
            .with_content(command);
        if let Err(message) = ctx.confirm(request).await {
            return Ok(ToolResult::err(message));
        }

        let cwd = self.workdir.get();
        debug!(command = %command, cwd = %cwd.display(), "Executing bash command");

        let child = Command::new("sh")
            .args(["-c", command])
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ToolError::ExecutionFailed {
                    tool_name: "bash".into(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(command = %command, timeout_secs = self.timeout_secs, "Command timed out");
                return Ok(ToolResult::err(format!(
                    "Command timed out after {}s: {command}",
                    self.timeout_secs
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if output.status.success() {
            let text = match (stdout.is_empty(), stderr.is_empty()) {
                (true, true) => "Command executed successfully (no output)".to_string(),
                (false, true) => stdout,
                (true, false) => stderr,
                (false, false) => format!("{stdout}\n{stderr}"),
            };
            Ok(ToolResult::ok(text))
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            let detail = if stderr.is_empty() { stdout } else { stderr };
            Ok(ToolResult::err(format!("Command failed (exit code {code}): {detail}")))
        }
    }
}
