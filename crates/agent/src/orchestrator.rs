//! The conversation loop: model calls, tool rounds, modes and cancellation.
//!
//! A submission appends the user's request to the model context, then
//! alternates between asking the model for the next message and running the
//! tools it requested, until the model answers in plain text or the round
//! limit is hit. Streaming submissions run on their own task and report
//! progress as [`StreamingChunk`]s; every submission ends with exactly one
//! `Done`.

use codeclaw_config::AppConfig;
use codeclaw_core::chat::ChatEntry;
use codeclaw_core::confirmation::{ConfirmationGateway, ConfirmationKind};
use codeclaw_core::error::ProviderError;
use codeclaw_core::event::{DomainEvent, EventBus};
use codeclaw_core::message::{Message, ToolCall};
use codeclaw_core::mode::Mode;
use codeclaw_core::provider::{Provider, ProviderRequest};
use codeclaw_core::tool::{ToolRegistry, ToolResult};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::ContextStore;
use crate::dispatcher::ToolDispatcher;
use crate::plan::is_plan_content;
use crate::prompt::{PromptManager, load_custom_instructions};
use crate::stream_event::StreamingChunk;
use crate::token::{DEFAULT_MAX_CONTEXT_TOKENS, TokenBudgetTracker};

pub const CANCELLED_NOTICE: &str = "\n\n[Operation cancelled by user]";
pub const ROUND_LIMIT_WARNING: &str =
    "\n\nMaximum tool execution rounds reached. Stopping to prevent infinite loops.";

/// Chunks buffered between the loop task and the consumer.
const CHUNK_BUFFER: usize = 128;

/// Where the orchestrator is in its current (or last) submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    Idle,
    Responding,
    ExecutingTools,
    Done,
    Cancelled,
    Error,
}

impl OrchestratorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Error)
    }
}

/// Settings for an [`AgentOrchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub model: String,
    /// Round limit for [`AgentOrchestrator::process`]
    pub max_rounds: u32,
    /// Round limit for [`AgentOrchestrator::submit`]
    pub max_stream_rounds: u32,
    pub max_context_tokens: usize,
    pub initial_mode: Mode,
    pub custom_instructions: Option<String>,
    pub cwd: PathBuf,
}

impl OrchestratorConfig {
    /// Derive settings from the app config for a session rooted at `cwd`.
    ///
    /// Inline custom instructions win over the project's instructions file.
    pub fn from_app_config(config: &AppConfig, cwd: impl Into<PathBuf>) -> Self {
        let cwd = cwd.into();
        let custom_instructions = config
            .custom_instructions
            .clone()
            .or_else(|| load_custom_instructions(&cwd));
        Self {
            model: config.default_model.clone(),
            max_rounds: config.agent.max_rounds,
            max_stream_rounds: config.agent.max_stream_rounds,
            max_context_tokens: config.agent.max_context_tokens,
            initial_mode: config.agent.default_mode,
            custom_instructions,
            cwd,
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: "devstral-medium-2507".into(),
            max_rounds: 10,
            max_stream_rounds: 30,
            max_context_tokens: DEFAULT_MAX_CONTEXT_TOKENS,
            initial_mode: Mode::default(),
            custom_instructions: None,
            cwd: PathBuf::from("."),
        }
    }
}

/// Mutable conversation state, guarded by the session lock.
struct Session {
    mode: Mode,
    model: String,
    context: ContextStore,
    history: Vec<ChatEntry>,
}

struct Inner {
    provider: Arc<dyn Provider>,
    dispatcher: ToolDispatcher,
    prompts: PromptManager,
    config: OrchestratorConfig,
    event_bus: Arc<EventBus>,
    session: Mutex<Session>,
    in_flight: StdMutex<Option<(u64, CancellationToken)>>,
    next_submission: AtomicU64,
    state: StdMutex<OrchestratorState>,
}

/// Drives conversations with the model on behalf of one user session.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct AgentOrchestrator {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AgentOrchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        gateway: Arc<dyn ConfirmationGateway>,
        config: OrchestratorConfig,
    ) -> Self {
        Self::with_event_bus(provider, tools, gateway, config, Arc::new(EventBus::default()))
    }

    pub fn with_event_bus(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        gateway: Arc<dyn ConfirmationGateway>,
        config: OrchestratorConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let prompts = PromptManager::new(config.cwd.clone());
        let tracker = TokenBudgetTracker::new(&config.model, config.max_context_tokens);
        let mut context = ContextStore::new(tracker);
        context.append(Message::system(
            prompts.system_message(config.initial_mode, config.custom_instructions.as_deref()),
        ));

        let session = Session {
            mode: config.initial_mode,
            model: config.model.clone(),
            context,
            history: Vec::new(),
        };

        Self {
            inner: Arc::new(Inner {
                provider,
                dispatcher: ToolDispatcher::new(tools, gateway),
                prompts,
                config,
                event_bus,
                session: Mutex::new(session),
                in_flight: StdMutex::new(None),
                next_submission: AtomicU64::new(1),
                state: StdMutex::new(OrchestratorState::Idle),
            }),
        }
    }

    /// Submit a request and stream its progress.
    ///
    /// The loop runs on a spawned task; dropping the returned stream cancels
    /// the submission at its next check point. Must be called from within a
    /// tokio runtime.
    pub fn submit(&self, text: impl Into<String>, mode: Mode) -> ChunkStream {
        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
        let guard = self.begin_submission();
        let this = self.clone();
        let text = text.into();

        tokio::spawn(async move {
            let mut session = this.inner.session.lock().await;
            let out = Emitter::channel(tx, guard.token.clone());
            let limit = this.inner.config.max_stream_rounds;
            this.run_submission(&mut session, &text, mode, limit, &out, &guard.token)
                .await;
            drop(session);
            drop(guard);
        });

        ChunkStream {
            inner: ReceiverStream::new(rx),
        }
    }

    /// Run a request to completion without streaming.
    ///
    /// Returns the history entries this submission created, user entry first.
    pub async fn process(&self, text: &str, mode: Mode) -> Vec<ChatEntry> {
        let guard = self.begin_submission();
        let mut session = self.inner.session.lock().await;
        let start = session.history.len();
        let limit = self.inner.config.max_rounds;
        self.run_submission(&mut session, text, mode, limit, &Emitter::Discard, &guard.token)
            .await;
        session.history[start..].to_vec()
    }

    /// Request cancellation of the in-flight submission. Idempotent; a
    /// no-op when nothing is running.
    pub fn cancel(&self) {
        if let Some((id, token)) = lock(&self.inner.in_flight).as_ref() {
            debug!(submission = id, "Cancellation requested");
            token.cancel();
        }
    }

    pub async fn chat_history(&self) -> Vec<ChatEntry> {
        self.inner.session.lock().await.history.clone()
    }

    /// Clear the conversation, keeping only the system message, and forget
    /// session-wide approvals.
    pub async fn clear_history(&self) {
        let mut session = self.inner.session.lock().await;
        session.history.clear();
        session.context.clear(true);
        self.inner.dispatcher.reset_session();
        self.inner.event_bus.publish(DomainEvent::HistoryCleared {
            timestamp: chrono::Utc::now(),
        });
        info!("Conversation history cleared");
    }

    /// Approve file edits and shell commands for the rest of the session.
    pub fn approve_session(&self) {
        self.inner.dispatcher.approve_session();
    }

    /// Forget session-wide approvals, keeping the conversation.
    pub fn reset_session_approvals(&self) {
        self.inner.dispatcher.reset_session();
    }

    pub fn is_session_approved(&self, kind: ConfirmationKind) -> bool {
        self.inner.dispatcher.is_session_approved(kind)
    }

    pub async fn set_model(&self, model: impl Into<String>) {
        let model = model.into();
        let mut session = self.inner.session.lock().await;
        session.context.set_tracker(TokenBudgetTracker::new(
            &model,
            self.inner.config.max_context_tokens,
        ));
        info!(from = %session.model, to = %model, "Model changed");
        session.model = model;
    }

    pub async fn current_model(&self) -> String {
        self.inner.session.lock().await.model.clone()
    }

    /// The mode the model context was last built for.
    pub async fn current_mode(&self) -> Mode {
        self.inner.session.lock().await.mode
    }

    pub fn state(&self) -> OrchestratorState {
        *lock(&self.inner.state)
    }

    pub async fn context_percentage_left(&self) -> u8 {
        self.inner.session.lock().await.context.percentage_left()
    }

    /// Snapshot of the model context.
    pub async fn context_messages(&self) -> Vec<Message> {
        self.inner.session.lock().await.context.list()
    }

    pub fn current_directory(&self) -> &Path {
        self.inner.prompts.cwd()
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.inner.event_bus.clone()
    }

    /// The system message for `mode` in this session.
    pub fn system_message(&self, mode: Mode) -> String {
        self.inner
            .prompts
            .system_message(mode, self.inner.config.custom_instructions.as_deref())
    }

    fn set_state(&self, state: OrchestratorState) {
        *lock(&self.inner.state) = state;
    }

    fn begin_submission(&self) -> SubmissionGuard {
        let id = self.inner.next_submission.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        *lock(&self.inner.in_flight) = Some((id, token.clone()));
        SubmissionGuard {
            inner: self.inner.clone(),
            id,
            token,
        }
    }

    async fn run_submission(
        &self,
        session: &mut Session,
        text: &str,
        mode: Mode,
        limit: u32,
        out: &Emitter,
        token: &CancellationToken,
    ) {
        self.set_state(OrchestratorState::Responding);
        info!(mode = %mode, model = %session.model, "Processing submission");

        session.history.push(ChatEntry::user(text));
        let user_message = Message::user(self.inner.prompts.contextual_message(mode, text));

        if mode != session.mode {
            let prior = &session.history[..session.history.len() - 1];
            session
                .context
                .rebuild(self.system_message(mode), prior, user_message);
            info!(from = %session.mode, to = %mode, "Mode changed, context rebuilt");
            self.inner.event_bus.publish(DomainEvent::ModeChanged {
                from: session.mode,
                to: mode,
                timestamp: chrono::Utc::now(),
            });
            session.mode = mode;
        } else {
            session.context.append(user_message);
        }

        out.emit(StreamingChunk::TokenCount {
            count: session.context.total_tokens(),
        })
        .await;

        let terminal = match self.run_rounds(session, mode, limit, out, token).await {
            Ok(state) => state,
            Err(_) if token.is_cancelled() => self.cancelled(out).await,
            Err(e) => {
                error!(error = %e, "Submission failed");
                self.inner.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: "chat completion".into(),
                    error_message: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                let message = format!("Sorry, I encountered an error: {e}");
                session.history.push(ChatEntry::assistant(&message));
                out.emit(StreamingChunk::content(message)).await;
                OrchestratorState::Error
            }
        };

        out.emit(StreamingChunk::Done).await;
        self.set_state(terminal);
        debug!(state = ?terminal, "Submission finished");
    }

    async fn run_rounds(
        &self,
        session: &mut Session,
        mode: Mode,
        limit: u32,
        out: &Emitter,
        token: &CancellationToken,
    ) -> Result<OrchestratorState, ProviderError> {
        let tools = self.inner.dispatcher.definitions();
        let mut rounds = 0;

        while rounds < limit {
            if token.is_cancelled() {
                return Ok(self.cancelled(out).await);
            }

            self.set_state(OrchestratorState::Responding);
            let input_tokens = session.context.total_tokens();
            let request =
                ProviderRequest::new(&session.model, session.context.optimized(), tools.clone());

            debug!(round = rounds + 1, input_tokens, "Requesting completion");
            let response = self.inner.provider.complete(request).await?;
            let message = response.message;

            if message.content.is_empty() && message.tool_calls.is_empty() {
                return Err(ProviderError::EmptyResponse);
            }

            let output_tokens = session
                .context
                .tracker()
                .count_message_tokens(std::slice::from_ref(&message));
            out.emit(StreamingChunk::TokenCount {
                count: input_tokens + output_tokens,
            })
            .await;

            self.inner.event_bus.publish(DomainEvent::ResponseGenerated {
                model: response.model,
                tokens_used: response
                    .usage
                    .map(|u| u.total_tokens)
                    .unwrap_or(output_tokens as u32),
                tool_calls: message.tool_calls.len(),
                timestamp: chrono::Utc::now(),
            });

            if message.tool_calls.is_empty() {
                let content = message.content;
                let chunk = if mode.is_plan() && is_plan_content(&content) {
                    StreamingChunk::Plan {
                        content: content.clone(),
                    }
                } else {
                    StreamingChunk::content(content.clone())
                };
                out.emit(chunk).await;
                session.history.push(ChatEntry::assistant(&content));
                session.context.append(Message::assistant(content));
                return Ok(OrchestratorState::Done);
            }

            rounds += 1;
            self.set_state(OrchestratorState::ExecutingTools);
            let calls = message.tool_calls;
            debug!(round = rounds, tools = calls.len(), "Executing tool calls");

            out.emit(StreamingChunk::ToolCalls {
                tool_calls: calls.clone(),
            })
            .await;
            session
                .history
                .push(ChatEntry::assistant_with_tools(&message.content, calls.clone()));
            session
                .context
                .append(Message::assistant_with_tools(message.content, calls.clone()));

            for (index, call) in calls.iter().enumerate() {
                if token.is_cancelled() {
                    Self::close_unanswered(session, &calls[index..]);
                    return Ok(self.cancelled(out).await);
                }

                let started = Instant::now();
                let result = self.inner.dispatcher.dispatch(call, mode).await;
                self.inner.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: call.name.clone(),
                    success: result.success,
                    duration_ms: started.elapsed().as_millis() as u64,
                    timestamp: chrono::Utc::now(),
                });

                session
                    .context
                    .append(Message::tool_result(&call.id, result.message_text()));
                session
                    .history
                    .push(ChatEntry::tool_result(call.clone(), result.clone()));
                out.emit(StreamingChunk::ToolResult {
                    tool_call: call.clone(),
                    tool_result: result,
                })
                .await;
            }
        }

        warn!(rounds, "Maximum tool rounds reached");
        session
            .history
            .push(ChatEntry::assistant(ROUND_LIMIT_WARNING.trim_start()));
        out.emit(StreamingChunk::content(ROUND_LIMIT_WARNING)).await;
        Ok(OrchestratorState::Done)
    }

    async fn cancelled(&self, out: &Emitter) -> OrchestratorState {
        info!("Submission cancelled");
        out.emit(StreamingChunk::content(CANCELLED_NOTICE)).await;
        OrchestratorState::Cancelled
    }

    /// Answer tool calls skipped by cancellation so every call in the
    /// context still has a correlated tool message.
    fn close_unanswered(session: &mut Session, calls: &[ToolCall]) {
        for call in calls {
            let result = ToolResult::err("Operation cancelled by user");
            session
                .context
                .append(Message::tool_result(&call.id, result.message_text()));
            session
                .history
                .push(ChatEntry::tool_result(call.clone(), result));
        }
    }
}

/// Releases the in-flight token when a submission ends, however it ends.
struct SubmissionGuard {
    inner: Arc<Inner>,
    id: u64,
    token: CancellationToken,
}

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        let mut in_flight = lock(&self.inner.in_flight);
        if matches!(in_flight.as_ref(), Some((id, _)) if *id == self.id) {
            *in_flight = None;
        }
    }
}

/// Where a submission's chunks go.
enum Emitter {
    Channel {
        tx: mpsc::Sender<StreamingChunk>,
        token: CancellationToken,
    },
    Discard,
}

impl Emitter {
    fn channel(tx: mpsc::Sender<StreamingChunk>, token: CancellationToken) -> Self {
        Self::Channel { tx, token }
    }

    async fn emit(&self, chunk: StreamingChunk) {
        if let Self::Channel { tx, token } = self
            && tx.send(chunk).await.is_err()
            && !token.is_cancelled()
        {
            debug!("Chunk consumer went away, cancelling submission");
            token.cancel();
        }
    }
}

/// The consumer side of a streaming submission.
pub struct ChunkStream {
    inner: ReceiverStream<StreamingChunk>,
}

impl Stream for ChunkStream {
    type Item = StreamingChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use codeclaw_core::confirmation::AutoApprove;
    use codeclaw_core::message::Role;
    use futures::StreamExt;
    use std::sync::OnceLock;
    use std::sync::atomic::Ordering as AtomicOrdering;

    fn registry(tools: Vec<Box<dyn codeclaw_core::Tool>>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for tool in tools {
            registry.register(tool);
        }
        Arc::new(registry)
    }

    fn orchestrator(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> AgentOrchestrator {
        AgentOrchestrator::new(provider, tools, Arc::new(AutoApprove), config)
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            cwd: PathBuf::from("/work"),
            ..OrchestratorConfig::default()
        }
    }

    async fn collect(stream: ChunkStream) -> Vec<StreamingChunk> {
        stream.collect().await
    }

    fn contents(chunks: &[StreamingChunk]) -> Vec<&str> {
        chunks
            .iter()
            .filter_map(|c| match c {
                StreamingChunk::Content { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    fn assert_single_done_last(chunks: &[StreamingChunk]) {
        assert_eq!(chunks.iter().filter(|c| c.is_done()).count(), 1);
        assert!(chunks.last().unwrap().is_done());
    }

    #[tokio::test]
    async fn plain_answer_streams_content_then_done() {
        let provider = Arc::new(SequentialMockProvider::single_text("Hello there"));
        let agent = orchestrator(provider.clone(), registry(vec![]), config());

        let chunks = collect(agent.submit("hi", Mode::AutoAcceptOff)).await;
        let kinds: Vec<&str> = chunks.iter().map(StreamingChunk::kind).collect();
        assert_eq!(kinds, ["token_count", "token_count", "content", "done"]);
        assert_eq!(contents(&chunks), ["Hello there"]);
        assert_eq!(agent.state(), OrchestratorState::Done);

        let history = agent.chat_history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].content, "Hello there");
    }

    #[tokio::test]
    async fn read_only_tool_round_then_answer() {
        let view = CountingTool::read_only("view_file");
        let calls = view.calls();
        let gateway = Arc::new(RecordingGateway::default());
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("call_1", "view_file", serde_json::json!({"path": "."}))],
            "Two files.",
        ));
        let agent = AgentOrchestrator::new(
            provider.clone(),
            registry(vec![Box::new(view)]),
            gateway.clone(),
            config(),
        );

        let chunks = collect(agent.submit("list files", Mode::AutoAcceptOff)).await;
        let kinds: Vec<&str> = chunks.iter().map(StreamingChunk::kind).collect();
        assert_eq!(
            kinds,
            [
                "token_count",
                "token_count",
                "tool_calls",
                "tool_result",
                "token_count",
                "content",
                "done"
            ]
        );
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(gateway.requests(), 0);
        assert_eq!(provider.call_count(), 2);

        // The second request carries the tool message correlated by id.
        let second = &provider.requests()[1].messages;
        let tool_msg = second.iter().find(|m| m.role == Role::Tool).unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn plan_mode_gates_create_and_keeps_looping() {
        let create = CountingTool::mutating("create_file", "File creation");
        let calls = create.calls();
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call(
                "call_1",
                "create_file",
                serde_json::json!({"path": "foo.txt", "content": "x"}),
            )],
            "I can only plan here.",
        ));
        let agent = orchestrator(provider.clone(), registry(vec![Box::new(create)]), config());

        let chunks = collect(agent.submit("create foo.txt", Mode::Plan)).await;
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);

        let gated = chunks
            .iter()
            .find_map(|c| match c {
                StreamingChunk::ToolResult { tool_result, .. } => Some(tool_result.clone()),
                _ => None,
            })
            .unwrap();
        assert!(!gated.success);
        assert!(gated.error.unwrap().contains("not allowed in plan mode"));

        // The loop continued to a second model call with the tool message in context.
        assert_eq!(provider.call_count(), 2);
        let context = agent.context_messages().await;
        assert!(context.iter().any(|m| m.role == Role::Tool));
        assert_single_done_last(&chunks);
    }

    #[tokio::test]
    async fn plan_reply_in_plan_mode_is_classified() {
        let plan = "# Plan for cache\n\n## Objective\nFaster\n\n## Implementation Steps\n1. Add it";
        let provider = Arc::new(SequentialMockProvider::single_text(plan));
        let agent = orchestrator(provider, registry(vec![]), config());

        let chunks = collect(agent.submit("plan a cache", Mode::Plan)).await;
        assert!(chunks.iter().any(|c| matches!(c, StreamingChunk::Plan { .. })));
        assert!(contents(&chunks).is_empty());
    }

    #[tokio::test]
    async fn plan_reply_outside_plan_mode_is_content() {
        let plan = "# Plan for cache\n\n## Objective\nFaster\n\n## Implementation Steps\n1. Add it";
        let provider = Arc::new(SequentialMockProvider::single_text(plan));
        let agent = orchestrator(provider, registry(vec![]), config());

        let chunks = collect(agent.submit("plan a cache", Mode::AutoAcceptOn)).await;
        assert!(!chunks.iter().any(|c| matches!(c, StreamingChunk::Plan { .. })));
        assert_eq!(contents(&chunks), [plan]);
    }

    #[tokio::test]
    async fn mode_switch_reseeds_system_message() {
        let replies = (0..6).map(|i| make_text_response(&format!("reply {i}"))).collect();
        let provider = Arc::new(SequentialMockProvider::new(replies));
        let agent = orchestrator(provider.clone(), registry(vec![]), config());

        for mode in [Mode::AutoAcceptOn, Mode::Plan, Mode::AutoAcceptOff] {
            collect(agent.submit("hello", mode)).await;
            let context = agent.context_messages().await;
            assert_eq!(context[0].role, Role::System);
            assert_eq!(context[0].content, agent.system_message(mode));
            assert_eq!(agent.current_mode().await, mode);
        }

        // History was replayed: three user turns and two earlier replies precede the last reply.
        let context = agent.context_messages().await;
        let users = context.iter().filter(|m| m.role == Role::User).count();
        assert_eq!(users, 3);
    }

    #[tokio::test]
    async fn plan_mode_wraps_user_message_but_not_history() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let agent = orchestrator(provider.clone(), registry(vec![]), config());

        collect(agent.submit("add caching", Mode::Plan)).await;
        let sent = &provider.requests()[0].messages;
        let user = sent.iter().find(|m| m.role == Role::User).unwrap();
        assert!(user.content.starts_with("PLAN MODE ACTIVE"));
        assert!(user.content.ends_with("User request: add caching"));
        assert_eq!(agent.chat_history().await[0].content, "add caching");
    }

    #[tokio::test]
    async fn round_limit_stops_with_warning() {
        for limit in [1u32, 3] {
            let provider = Arc::new(LoopingProvider::new("view_file"));
            let view = CountingTool::read_only("view_file");
            let calls = view.calls();
            let agent = orchestrator(
                provider.clone(),
                registry(vec![Box::new(view)]),
                OrchestratorConfig {
                    max_stream_rounds: limit,
                    ..config()
                },
            );

            let chunks = collect(agent.submit("loop forever", Mode::AutoAcceptOn)).await;
            assert_eq!(provider.call_count(), limit as usize);
            assert_eq!(calls.load(AtomicOrdering::SeqCst), limit as usize);
            assert_eq!(contents(&chunks), [ROUND_LIMIT_WARNING]);
            assert_single_done_last(&chunks);
        }
    }

    #[tokio::test]
    async fn process_uses_its_own_round_limit() {
        let provider = Arc::new(LoopingProvider::new("view_file"));
        let agent = orchestrator(
            provider.clone(),
            registry(vec![Box::new(CountingTool::read_only("view_file"))]),
            OrchestratorConfig {
                max_rounds: 2,
                ..config()
            },
        );

        let entries = agent.process("loop", Mode::AutoAcceptOn).await;
        assert_eq!(provider.call_count(), 2);
        assert_eq!(entries[0].content, "loop");
        assert_eq!(
            entries.last().unwrap().content,
            ROUND_LIMIT_WARNING.trim_start()
        );
    }

    #[tokio::test]
    async fn cancel_between_dispatches_stops_everything() {
        let slot: Arc<OnceLock<AgentOrchestrator>> = Arc::new(OnceLock::new());
        let hook_slot = slot.clone();
        let first = CountingTool::read_only("first").with_hook(move || {
            if let Some(agent) = hook_slot.get() {
                agent.cancel();
            }
        });
        let second = CountingTool::read_only("second");
        let second_calls = second.calls();

        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_tool_call_response(
                vec![
                    make_tool_call("call_1", "first", serde_json::json!({})),
                    make_tool_call("call_2", "second", serde_json::json!({})),
                ],
                "",
            ),
            make_text_response("never requested"),
        ]));
        let agent = orchestrator(
            provider.clone(),
            registry(vec![Box::new(first), Box::new(second)]),
            config(),
        );
        let _ = slot.set(agent.clone());

        let chunks = collect(agent.submit("do two things", Mode::AutoAcceptOn)).await;
        assert_eq!(second_calls.load(AtomicOrdering::SeqCst), 0);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(contents(&chunks), [CANCELLED_NOTICE]);
        assert_single_done_last(&chunks);
        assert_eq!(agent.state(), OrchestratorState::Cancelled);

        // The skipped call is still answered in the context.
        let context = agent.context_messages().await;
        let answered: Vec<_> = context
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(answered, ["call_1", "call_2"]);
    }

    #[tokio::test]
    async fn cancel_only_affects_in_flight_submission() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_text_response("one"),
            make_text_response("two"),
        ]));
        let agent = orchestrator(provider, registry(vec![]), config());

        agent.cancel();
        agent.cancel();
        let chunks = collect(agent.submit("hi", Mode::AutoAcceptOff)).await;
        assert_eq!(contents(&chunks), ["one"]);
    }

    #[tokio::test]
    async fn transport_error_is_narrated() {
        let provider = Arc::new(SequentialMockProvider::scripted(vec![Err(
            ProviderError::Network("connection refused".into()),
        )]));
        let agent = orchestrator(provider, registry(vec![]), config());

        let chunks = collect(agent.submit("hi", Mode::AutoAcceptOff)).await;
        assert_eq!(
            contents(&chunks),
            ["Sorry, I encountered an error: Network error: connection refused"]
        );
        assert_single_done_last(&chunks);
        assert_eq!(agent.state(), OrchestratorState::Error);

        // The session stays usable.
        let history = agent.chat_history().await;
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let provider = Arc::new(SequentialMockProvider::single_text(""));
        let agent = orchestrator(provider, registry(vec![]), config());

        let chunks = collect(agent.submit("hi", Mode::AutoAcceptOff)).await;
        assert!(contents(&chunks)[0].starts_with("Sorry, I encountered an error: No response from model"));
    }

    #[tokio::test]
    async fn clear_history_keeps_system_message() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let agent = orchestrator(provider, registry(vec![]), config());
        collect(agent.submit("hi", Mode::AutoAcceptOff)).await;

        agent.clear_history().await;
        assert!(agent.chat_history().await.is_empty());
        let context = agent.context_messages().await;
        assert_eq!(context.len(), 1);
        assert_eq!(context[0].role, Role::System);
    }

    #[tokio::test]
    async fn set_model_is_used_for_next_request() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let agent = orchestrator(provider.clone(), registry(vec![]), config());
        agent.set_model("devstral-small-2505").await;
        assert_eq!(agent.current_model().await, "devstral-small-2505");

        collect(agent.submit("hi", Mode::AutoAcceptOff)).await;
        assert_eq!(provider.requests()[0].model, "devstral-small-2505");
        assert!(agent.context_percentage_left().await > 90);
    }

    #[tokio::test]
    async fn mode_change_is_published() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let agent = orchestrator(provider, registry(vec![]), config());
        let mut events = agent.event_bus().subscribe();

        collect(agent.submit("hi", Mode::Plan)).await;
        let mut saw_mode_change = false;
        while let Ok(event) = events.try_recv() {
            if let DomainEvent::ModeChanged { from, to, .. } = event.as_ref() {
                assert_eq!((*from, *to), (Mode::AutoAcceptOff, Mode::Plan));
                saw_mode_change = true;
            }
        }
        assert!(saw_mode_change);
    }
}
