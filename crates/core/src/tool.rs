//! Tool trait — the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the workspace:
//! view and edit files, run shell commands, search the web, keep a todo list.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::confirmation::{
    ConfirmationGateway, ConfirmationOutcome, ConfirmationRequest, SessionApprovals,
};
use crate::error::ToolError;
use crate::mode::Mode;
use crate::provider::ToolDefinition;

/// The result of a tool execution.
///
/// Exactly one of `output` / `error` is meaningful, selected by `success`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool executed successfully
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Text recorded in the user-facing history.
    pub fn display_text(&self) -> String {
        if self.success {
            self.output.clone().unwrap_or_else(|| "Success".into())
        } else {
            self.error.clone().unwrap_or_else(|| "Error occurred".into())
        }
    }

    /// Text sent back to the model in the `tool` message.
    pub fn message_text(&self) -> String {
        if self.success {
            self.output.clone().unwrap_or_else(|| "Success".into())
        } else {
            self.error.clone().unwrap_or_else(|| "Error".into())
        }
    }
}

/// Per-dispatch context handed to a tool.
///
/// Carries the active mode and the explicitly injected confirmation gateway.
#[derive(Clone)]
pub struct ToolContext {
    pub mode: Mode,
    gateway: Arc<dyn ConfirmationGateway>,
    approvals: Arc<SessionApprovals>,
}

impl ToolContext {
    pub fn new(
        mode: Mode,
        gateway: Arc<dyn ConfirmationGateway>,
        approvals: Arc<SessionApprovals>,
    ) -> Self {
        Self {
            mode,
            gateway,
            approvals,
        }
    }

    /// Ask for approval before a side effect.
    ///
    /// `Err` carries the message the tool should report as its failure.
    /// Auto-accept-on mode and kinds approved for the session skip the
    /// gateway entirely.
    pub async fn confirm(&self, request: ConfirmationRequest) -> Result<(), String> {
        if self.mode == Mode::AutoAcceptOn || self.approvals.is_approved(request.kind) {
            return Ok(());
        }

        let operation = request.operation.clone();
        let kind = request.kind;
        match self.gateway.request(request).await {
            ConfirmationOutcome::Approved => Ok(()),
            ConfirmationOutcome::ApprovedForSession => {
                self.approvals.approve(kind);
                Ok(())
            }
            ConfirmationOutcome::Rejected { reason } => Err(match reason {
                Some(reason) if !reason.is_empty() => {
                    format!("{operation} rejected by user: {reason}")
                }
                _ => format!("{operation} cancelled by user"),
            }),
        }
    }
}

/// The core Tool trait.
///
/// Each tool (view_file, create_file, bash, web_search, etc.) implements this
/// trait. Tools are registered in the ToolRegistry and reached through the
/// dispatcher, which guarantees the arguments are valid JSON.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "bash", "view_file").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// For mutation-capable tools, the operation name refused in plan mode
    /// (e.g. "File creation"). Read-only tools return `None`.
    fn plan_restriction(&self) -> Option<&str> {
        None
    }

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        arguments: serde_json::Value,
        ctx: &ToolContext,
    ) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, kept in registration order so the schema
/// sent to the model is stable between requests.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
