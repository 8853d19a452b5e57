//! The agent orchestration engine behind CodeClaw.
//!
//! One submission flows through:
//!
//! 1. **Prompting**: the [`PromptManager`] picks the system message for the
//!    active mode and wraps plan-mode requests
//! 2. **Context**: the [`ContextStore`] holds the model-facing messages and
//!    is rebuilt from the chat history whenever the mode changes
//! 3. **Model call**: the configured provider returns text or tool calls
//! 4. **Tools**: the [`ToolDispatcher`] gates, runs and isolates each call
//! 5. **Streaming**: progress is reported as [`StreamingChunk`]s, ending in
//!    exactly one `Done`
//!
//! The [`AgentOrchestrator`] ties these together and owns cancellation and
//! the round limits.

pub mod context;
pub mod dispatcher;
pub mod orchestrator;
pub mod plan;
pub mod prompt;
pub mod stream_event;
pub mod token;

#[cfg(test)]
mod test_helpers;

pub use context::ContextStore;
pub use dispatcher::ToolDispatcher;
pub use orchestrator::{
    AgentOrchestrator, CANCELLED_NOTICE, ChunkStream, OrchestratorConfig, OrchestratorState,
    ROUND_LIMIT_WARNING,
};
pub use plan::is_plan_content;
pub use prompt::{INSTRUCTIONS_FILE, PromptManager, load_custom_instructions};
pub use stream_event::StreamingChunk;
pub use token::{DEFAULT_MAX_CONTEXT_TOKENS, TokenBudgetTracker};
