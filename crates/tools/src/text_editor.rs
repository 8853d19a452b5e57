//! File tools: view, create, and in-place string replacement.
//!
//! `create_file` and `str_replace_editor` ask for confirmation (kind
//! `File`) before touching the disk and are refused in plan mode.

use async_trait::async_trait;
use codeclaw_core::confirmation::{ConfirmationKind, ConfirmationRequest};
use codeclaw_core::error::ToolError;
use codeclaw_core::tool::{Tool, ToolContext, ToolResult};
use tracing::debug;

use crate::WorkingDir;

fn required_str<'a>(arguments: &'a serde_json::Value, key: &str) -> Result<&'a str, ToolError> {
    arguments[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// View a file with line numbers, or list a directory.
pub struct ViewFileTool {
    workdir: WorkingDir,
}

impl ViewFileTool {
    pub fn new(workdir: WorkingDir) -> Self {
        Self { workdir }
    }
}

#[async_trait]
impl Tool for ViewFileTool {
    fn name(&self) -> &str {
        "view_file"
    }

    fn description(&self) -> &str {
        "View contents of a file or list directory contents"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to file or directory to view"
                },
                "start_line": {
                    "type": "number",
                    "description": "Starting line number for partial file view (optional)"
                },
                "end_line": {
                    "type": "number",
                    "description": "Ending line number for partial file view (optional)"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let resolved = self.workdir.resolve(path);

        let metadata = match tokio::fs::metadata(&resolved).await {
            Ok(m) => m,
            Err(_) => return Ok(ToolResult::err(format!("File or directory not found: {path}"))),
        };

        if metadata.is_dir() {
            let mut entries = match tokio::fs::read_dir(&resolved).await {
                Ok(entries) => entries,
                Err(e) => return Ok(ToolResult::err(format!("Failed to list {path}: {e}"))),
            };
            let mut names = Vec::new();
            while let Ok(Some(entry)) = entries.next_entry().await {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                    name.push('/');
                }
                names.push(name);
            }
            names.sort();
            return Ok(ToolResult::ok(format!(
                "Directory contents of {path}:\n{}",
                names.join("\n")
            )));
        }

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(e) => return Ok(ToolResult::err(format!("Failed to read file: {e}"))),
        };

        let lines: Vec<&str> = content.lines().collect();
        let start = arguments["start_line"].as_u64().map(|n| n as usize);
        let end = arguments["end_line"].as_u64().map(|n| n as usize);

        let (first, last) = match (start, end) {
            (None, None) => (1, lines.len()),
            (start, end) => {
                let first = start.unwrap_or(1).max(1);
                let last = end.unwrap_or(lines.len()).min(lines.len());
                if first > last {
                    return Ok(ToolResult::err(format!(
                        "Invalid line range {first}-{last} for {path} ({} lines)",
                        lines.len()
                    )));
                }
                (first, last)
            }
        };

        let numbered: Vec<String> = lines[first.saturating_sub(1)..last]
            .iter()
            .enumerate()
            .map(|(i, line)| format!("{}: {line}", first + i))
            .collect();

        let header = if first == 1 && last == lines.len() {
            format!("Contents of {path}:")
        } else {
            format!("Lines {first}-{last} of {path}:")
        };

        debug!(path, first, last, "Viewed file");
        Ok(ToolResult::ok(format!("{header}\n{}", numbered.join("\n"))))
    }
}

/// Create (or overwrite) a file with the given content.
pub struct CreateFileTool {
    workdir: WorkingDir,
}

impl CreateFileTool {
    pub fn new(workdir: WorkingDir) -> Self {
        Self { workdir }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &str {
        "create_file"
    }

    fn description(&self) -> &str {
        "Create a new file with specified content"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path where the file should be created"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    fn plan_restriction(&self) -> Option<&str> {
        Some("File creation")
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let content = required_str(&arguments, "content")?;

        let request = ConfirmationRequest::new(ConfirmationKind::File, "Create file")
            .with_filename(path)
            .with_content(content);
        if let Err(message) = ctx.confirm(request).await {
            return Ok(ToolResult::err(message));
        }

        let resolved = self.workdir.resolve(path);
        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult::err(format!("Failed to create directory: {e}")));
        }

        match tokio::fs::write(&resolved, content).await {
            Ok(()) => {
                let lines = content.lines().count();
                debug!(path, bytes = content.len(), "Created file");
                Ok(ToolResult::ok(format!("Created {path} ({lines} lines)")))
            }
            Err(e) => Ok(ToolResult::err(format!("Failed to write file: {e}"))),
        }
    }
}

/// Replace the first occurrence of a string in an existing file.
pub struct StrReplaceEditorTool {
    workdir: WorkingDir,
}

impl StrReplaceEditorTool {
    pub fn new(workdir: WorkingDir) -> Self {
        Self { workdir }
    }
}

#[async_trait]
impl Tool for StrReplaceEditorTool {
    fn name(&self) -> &str {
        "str_replace_editor"
    }

    fn description(&self) -> &str {
        "Replace specific text in a file. Use this for single line edits only"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to edit"
                },
                "old_str": {
                    "type": "string",
                    "description": "Text to replace (must match exactly)"
                },
                "new_str": {
                    "type": "string",
                    "description": "Text to replace with"
                }
            },
            "required": ["path", "old_str", "new_str"]
        })
    }

    fn plan_restriction(&self) -> Option<&str> {
        Some("File editing")
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let path = required_str(&arguments, "path")?;
        let old_str = required_str(&arguments, "old_str")?;
        let new_str = required_str(&arguments, "new_str")?;

        let resolved = self.workdir.resolve(path);
        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => content,
            Err(_) => return Ok(ToolResult::err(format!("File not found: {path}"))),
        };

        if old_str.is_empty() || !content.contains(old_str) {
            return Ok(ToolResult::err(format!("String not found in file: \"{old_str}\"")));
        }

        let preview = format!("- {old_str}\n+ {new_str}");
        let request = ConfirmationRequest::new(ConfirmationKind::File, "Edit file")
            .with_filename(path)
            .with_content(preview);
        if let Err(message) = ctx.confirm(request).await {
            return Ok(ToolResult::err(message));
        }

        let updated = content.replacen(old_str, new_str, 1);
        match tokio::fs::write(&resolved, &updated).await {
            Ok(()) => {
                debug!(path, "Edited file");
                Ok(ToolResult::ok(format!("Updated {path}")))
            }
            Err(e) => Ok(ToolResult::err(format!("Failed to write file: {e}"))),
        }
    }
}
