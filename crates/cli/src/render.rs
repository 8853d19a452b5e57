//! Plain-text rendering of streaming chunks.

use codeclaw_agent::StreamingChunk;
use std::io::{self, Write};

const RESULT_PREVIEW_LINES: usize = 10;
const ARGUMENT_PREVIEW_CHARS: usize = 80;

/// Writes chunks to a terminal as they arrive.
#[derive(Debug, Default)]
pub struct ChunkRenderer {
    tokens: usize,
}

impl ChunkRenderer {
    /// Latest context size reported by the orchestrator.
    pub fn tokens(&self) -> usize {
        self.tokens
    }

    pub fn render(&mut self, chunk: &StreamingChunk, out: &mut impl Write) -> io::Result<()> {
        match chunk {
            StreamingChunk::Content { content } => write!(out, "{content}")?,
            StreamingChunk::ToolCalls { tool_calls } => {
                for call in tool_calls {
                    writeln!(out, "\n⏺ {}({})", call.name, summarize_arguments(&call.arguments))?;
                }
            }
            StreamingChunk::ToolResult { tool_result, .. } => {
                let marker = if tool_result.success { "⎿" } else { "✗" };
                let text = tool_result.display_text();
                let total = text.lines().count();
                for (index, line) in text.lines().take(RESULT_PREVIEW_LINES).enumerate() {
                    let lead = if index == 0 { marker } else { " " };
                    writeln!(out, "  {lead} {line}")?;
                }
                if total > RESULT_PREVIEW_LINES {
                    writeln!(out, "    ... ({} more lines)", total - RESULT_PREVIEW_LINES)?;
                }
            }
            StreamingChunk::TokenCount { count } => self.tokens = *count,
            StreamingChunk::Plan { content } => writeln!(out, "\n📋 Plan\n\n{content}")?,
            StreamingChunk::Done => writeln!(out)?,
        }
        out.flush()
    }
}

/// A short, single-line view of a tool call's arguments.
fn summarize_arguments(arguments: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(arguments).ok();
    let key_arg = parsed.as_ref().and_then(|value| {
        ["path", "command", "query"]
            .iter()
            .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
    });
    let text = key_arg.unwrap_or(arguments).replace('\n', " ");

    if text.chars().count() > ARGUMENT_PREVIEW_CHARS {
        let cut: String = text.chars().take(ARGUMENT_PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        text
    }
}
