//! Scripted providers, tools and gateways shared by the agent tests.

use async_trait::async_trait;
use codeclaw_core::confirmation::{ConfirmationGateway, ConfirmationOutcome, ConfirmationRequest};
use codeclaw_core::error::{ProviderError, ToolError};
use codeclaw_core::message::{Message, ToolCall};
use codeclaw_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use codeclaw_core::tool::{Tool, ToolContext, ToolResult};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue; once the
/// script runs out every call fails with a malformed-response error.
pub struct SequentialMockProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    pub fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    /// Create a provider that first returns tool calls, then a final answer.
    pub fn tool_then_answer(tool_calls: Vec<ToolCall>, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, ""),
            make_text_response(answer),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(ProviderError::MalformedResponse("no more scripted responses".into()))
        })
    }
}

/// A provider that asks for the same tool on every call.
pub struct LoopingProvider {
    tool: String,
    calls: AtomicUsize,
}

impl LoopingProvider {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for LoopingProvider {
    fn name(&self) -> &str {
        "looping_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(make_tool_call_response(
            vec![ToolCall::new(format!("call_{n}"), self.tool.clone(), "{}")],
            "",
        ))
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    make_tool_call_response(Vec::new(), text)
}

/// Create a response with tool calls and optional content.
pub fn make_tool_call_response(tool_calls: Vec<ToolCall>, content: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools(content, tool_calls),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall::new(id, name, serde_json::to_string(&args).unwrap())
}

type Hook = Arc<dyn Fn() + Send + Sync>;

/// A tool that counts its invocations and optionally runs a hook.
pub struct CountingTool {
    name: String,
    restriction: Option<&'static str>,
    calls: Arc<AtomicUsize>,
    hook: Option<Hook>,
}

impl CountingTool {
    pub fn read_only(name: &str) -> Self {
        Self {
            name: name.into(),
            restriction: None,
            calls: Arc::new(AtomicUsize::new(0)),
            hook: None,
        }
    }

    pub fn mutating(name: &str, operation: &'static str) -> Self {
        Self {
            restriction: Some(operation),
            ..Self::read_only(name)
        }
    }

    pub fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Counts invocations"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    fn plan_restriction(&self) -> Option<&str> {
        self.restriction
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = &self.hook {
            hook();
        }
        Ok(ToolResult::ok(format!("{} call #{n}", self.name)))
    }
}

pub struct PanickingTool;

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "explode"
    }

    fn description(&self) -> &str {
        "Always panics"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
        _ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        panic!("kaboom")
    }
}

/// Approves everything and counts how often it was asked.
#[derive(Default)]
pub struct RecordingGateway {
    requests: AtomicUsize,
}

impl RecordingGateway {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfirmationGateway for RecordingGateway {
    async fn request(&self, _request: ConfirmationRequest) -> ConfirmationOutcome {
        self.requests.fetch_add(1, Ordering::SeqCst);
        ConfirmationOutcome::Approved
    }
}
