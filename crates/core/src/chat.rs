//! User-facing conversation record.
//!
//! A `ChatEntry` is what the user sees scroll by. The history is append-only
//! for the life of the session and is the source of truth when the wire
//! context has to be rebuilt after a mode switch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::{Message, ToolCall};
use crate::tool::ToolResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatEntryKind {
    User,
    Assistant,
    ToolResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: String,
    pub kind: ChatEntryKind,
    /// Raw text: the unwrapped user request, the assistant reply, or the
    /// tool output/error.
    pub content: String,
    pub timestamp: DateTime<Utc>,

    /// Tool calls requested by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// The call a tool_result entry answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<ToolResult>,
}

impl ChatEntry {
    fn new(kind: ChatEntryKind, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            content: content.into(),
            timestamp: Utc::now(),
            tool_calls: Vec::new(),
            tool_call: None,
            tool_result: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatEntryKind::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatEntryKind::Assistant, content)
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(ChatEntryKind::Assistant, content)
        }
    }

    pub fn tool_result(tool_call: ToolCall, result: ToolResult) -> Self {
        let content = result.display_text();
        Self {
            tool_call: Some(tool_call),
            tool_result: Some(result),
            ..Self::new(ChatEntryKind::ToolResult, content)
        }
    }

    /// Text to show for this entry, with placeholders for empty assistant turns.
    pub fn display_content(&self) -> &str {
        match self.kind {
            ChatEntryKind::Assistant if self.content.is_empty() && !self.tool_calls.is_empty() => {
                "Using tools to help you..."
            }
            ChatEntryKind::Assistant if self.content.is_empty() => {
                "I understand, but I don't have a specific response."
            }
            _ => &self.content,
        }
    }

    /// Convert this entry back into the wire message the model saw.
    ///
    /// Returns `None` for a tool_result entry that lost its call, since a
    /// tool message without a correlating id would be rejected upstream.
    pub fn to_message(&self) -> Option<Message> {
        match self.kind {
            ChatEntryKind::User => Some(Message::user(&self.content)),
            ChatEntryKind::Assistant => Some(Message::assistant_with_tools(
                &self.content,
                self.tool_calls.clone(),
            )),
            ChatEntryKind::ToolResult => {
                let call = self.tool_call.as_ref()?;
                let content = self
                    .tool_result
                    .as_ref()
                    .map(ToolResult::message_text)
                    .unwrap_or_else(|| self.content.clone());
                Some(Message::tool_result(&call.id, content))
            }
        }
    }
}
