//! Typed chunks emitted by a streaming submission.
//!
//! Serialized with a `type` tag so a front end can forward them as JSON
//! lines:
//! - `content`     — text for the user (reply, warning, error, cancellation)
//! - `tool_calls`  — the model asked for these tools this round
//! - `tool_result` — one tool finished
//! - `token_count` — current context size estimate
//! - `plan`        — final reply recognised as a plan (plan mode only)
//! - `done`        — always last, exactly once

use codeclaw_core::message::ToolCall;
use codeclaw_core::tool::ToolResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamingChunk {
    Content { content: String },

    ToolCalls { tool_calls: Vec<ToolCall> },

    ToolResult {
        tool_call: ToolCall,
        tool_result: ToolResult,
    },

    TokenCount { count: usize },

    Plan { content: String },

    Done,
}

impl StreamingChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            content: text.into(),
        }
    }

    /// The tag name used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Content { .. } => "content",
            Self::ToolCalls { .. } => "tool_calls",
            Self::ToolResult { .. } => "tool_result",
            Self::TokenCount { .. } => "token_count",
            Self::Plan { .. } => "plan",
            Self::Done => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}
