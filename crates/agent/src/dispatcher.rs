//! Routes model tool calls to their handlers.
//!
//! Nothing a handler does crosses this boundary as an error: bad JSON,
//! unknown tools, plan-mode refusals, handler errors and panics all come
//! back as a failed [`ToolResult`] that is fed to the model.

use codeclaw_core::confirmation::{ConfirmationGateway, ConfirmationKind, SessionApprovals};
use codeclaw_core::message::ToolCall;
use codeclaw_core::mode::Mode;
use codeclaw_core::tool::{ToolContext, ToolRegistry, ToolResult};
use codeclaw_core::ToolDefinition;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    gateway: Arc<dyn ConfirmationGateway>,
    approvals: Arc<SessionApprovals>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, gateway: Arc<dyn ConfirmationGateway>) -> Self {
        Self {
            registry,
            gateway,
            approvals: Arc::new(SessionApprovals::new()),
        }
    }

    /// The fixed tool schema offered to the model.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Forget "approve for this session" decisions.
    pub fn reset_session(&self) {
        self.approvals.reset();
    }

    /// Approve every confirmation kind for the rest of the session.
    pub fn approve_session(&self) {
        self.approvals.approve(ConfirmationKind::File);
        self.approvals.approve(ConfirmationKind::Bash);
    }

    pub fn is_session_approved(&self, kind: ConfirmationKind) -> bool {
        self.approvals.is_approved(kind)
    }

    pub async fn dispatch(&self, call: &ToolCall, mode: Mode) -> ToolResult {
        let started = Instant::now();

        let arguments: serde_json::Value = match serde_json::from_str(&call.arguments) {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Malformed tool arguments");
                return ToolResult::err(format!("Tool execution error: {e}"));
            }
        };

        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, "Unknown tool requested");
            return ToolResult::err(format!("Unknown tool: {}", call.name));
        };

        if mode.is_plan()
            && let Some(operation) = tool.plan_restriction()
        {
            debug!(tool = %call.name, "Refused mutating tool in plan mode");
            return ToolResult::err(format!(
                "{operation} is not allowed in plan mode. Switch to an auto-accept mode to make changes."
            ));
        }

        let ctx = ToolContext::new(mode, self.gateway.clone(), self.approvals.clone());
        let outcome = AssertUnwindSafe(tool.execute(arguments, &ctx))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ToolResult::err(format!("Tool execution error: {e}")),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool panicked".into());
                warn!(tool = %call.name, reason = %reason, "Tool panicked");
                ToolResult::err(format!("Tool execution error: {reason}"))
            }
        };

        debug!(
            tool = %call.name,
            success = result.success,
            duration_ms = started.elapsed().as_millis() as u64,
            "Tool dispatched"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{CountingTool, PanickingTool, RecordingGateway};
    use codeclaw_core::confirmation::AutoApprove;

    fn dispatcher_with(tools: Vec<Box<dyn codeclaw_core::Tool>>) -> ToolDispatcher {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        ToolDispatcher::new(Arc::new(registry), Arc::new(AutoApprove))
    }

    #[tokio::test]
    async fn malformed_json_never_reaches_handler() {
        let tool = CountingTool::read_only("view_file");
        let calls = tool.calls();
        let dispatcher = dispatcher_with(vec![Box::new(tool)]);

        let result = dispatcher
            .dispatch(&ToolCall::new("c1", "view_file", "{not json"), Mode::AutoAcceptOff)
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Tool execution error:"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_tool() {
        let dispatcher = dispatcher_with(vec![]);
        let result = dispatcher
            .dispatch(&ToolCall::new("c1", "rm_rf", "{}"), Mode::AutoAcceptOn)
            .await;
        assert_eq!(result.error.as_deref(), Some("Unknown tool: rm_rf"));
    }

    #[tokio::test]
    async fn plan_mode_gates_mutating_tools() {
        let tool = CountingTool::mutating("create_file", "File creation");
        let calls = tool.calls();
        let dispatcher = dispatcher_with(vec![Box::new(tool)]);

        let result = dispatcher
            .dispatch(&ToolCall::new("c1", "create_file", r#"{"path":"foo.txt"}"#), Mode::Plan)
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("File creation is not allowed in plan mode"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        let allowed = dispatcher
            .dispatch(&ToolCall::new("c2", "create_file", "{}"), Mode::AutoAcceptOn)
            .await;
        assert!(allowed.success);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_only_tool_runs_in_plan_mode_without_gateway() {
        let gateway = Arc::new(RecordingGateway::default());
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CountingTool::read_only("view_file")));
        let dispatcher = ToolDispatcher::new(Arc::new(registry), gateway.clone());

        let result = dispatcher
            .dispatch(&ToolCall::new("c1", "view_file", "{}"), Mode::Plan)
            .await;
        assert!(result.success);
        assert_eq!(gateway.requests(), 0);
    }

    #[test]
    fn session_approvals_cover_all_kinds_until_reset() {
        let dispatcher = dispatcher_with(vec![]);
        assert!(!dispatcher.is_session_approved(ConfirmationKind::File));

        dispatcher.approve_session();
        assert!(dispatcher.is_session_approved(ConfirmationKind::File));
        assert!(dispatcher.is_session_approved(ConfirmationKind::Bash));

        dispatcher.reset_session();
        assert!(!dispatcher.is_session_approved(ConfirmationKind::File));
        assert!(!dispatcher.is_session_approved(ConfirmationKind::Bash));
    }

    #[tokio::test]
    async fn handler_panic_becomes_failed_result() {
        let dispatcher = dispatcher_with(vec![Box::new(PanickingTool)]);
        let result = dispatcher
            .dispatch(&ToolCall::new("c1", "explode", "{}"), Mode::AutoAcceptOn)
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Tool execution error: kaboom"));
    }
}
