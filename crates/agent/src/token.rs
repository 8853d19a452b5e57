//! Token budget tracking for the model context.
//!
//! Uses a character-based heuristic: ~4 characters per token, rounded up.
//! The estimate is monotonic in text length and stable across calls, which
//! is all the percentage display and the token-count chunks need.

use codeclaw_core::message::Message;

/// Context window of the Devstral models.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 128_000;

/// Structural tokens per message (role markers and boundaries).
const MESSAGE_OVERHEAD: usize = 4;

/// Tokens reserved for priming the reply.
const RESPONSE_PRIMING: usize = 3;

/// Counts tokens for messages and reports how much budget remains.
///
/// Tied to one model; swapping models reconstructs the tracker.
#[derive(Debug, Clone)]
pub struct TokenBudgetTracker {
    model: String,
    max_tokens: usize,
}

impl TokenBudgetTracker {
    pub fn new(model: impl Into<String>, max_tokens: usize) -> Self {
        Self {
            model: model.into(),
            max_tokens: max_tokens.max(1),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Estimate the token count for a string.
    pub fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.len().div_ceil(4)
    }

    /// Count tokens for a chat-completions message list.
    ///
    /// Per message: role + content + serialized tool calls + 4 structural
    /// tokens; plus 3 for the response priming.
    pub fn count_message_tokens(&self, messages: &[Message]) -> usize {
        let body: usize = messages
            .iter()
            .map(|m| {
                let tool_calls = if m.tool_calls.is_empty() {
                    0
                } else {
                    serde_json::to_string(&m.tool_calls)
                        .map(|json| self.count_tokens(&json))
                        .unwrap_or(0)
                };
                self.count_tokens(m.role.as_str())
                    + self.count_tokens(&m.content)
                    + tool_calls
                    + MESSAGE_OVERHEAD
            })
            .sum();
        body + RESPONSE_PRIMING
    }

    /// Percentage of the budget still free, clamped at zero.
    pub fn percentage_left(&self, messages: &[Message]) -> u8 {
        let used = self.count_message_tokens(messages) as f64;
        let usage = (used / self.max_tokens as f64 * 100.0).round();
        (100.0 - usage).clamp(0.0, 100.0) as u8
    }
}

impl Default for TokenBudgetTracker {
    fn default() -> Self {
        Self::new("devstral-medium-2507", DEFAULT_MAX_CONTEXT_TOKENS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeclaw_core::message::ToolCall;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(TokenBudgetTracker::default().count_tokens(""), 0);
    }

    #[test]
    fn five_chars_rounds_up() {
        let tracker = TokenBudgetTracker::default();
        assert_eq!(tracker.count_tokens("test"), 1);
        assert_eq!(tracker.count_tokens("hello"), 2);
    }

    #[test]
    fn message_includes_role_overhead_and_priming() {
        let tracker = TokenBudgetTracker::default();
        // "user" → 1, "test" → 1, +4 structure, +3 priming
        assert_eq!(tracker.count_message_tokens(&[Message::user("test")]), 9);
        assert_eq!(tracker.count_message_tokens(&[]), 3);
    }

    #[test]
    fn tool_calls_are_counted() {
        let tracker = TokenBudgetTracker::default();
        let plain = Message::assistant("");
        let with_call = Message::assistant_with_tools(
            "",
            vec![ToolCall::new("call_1", "bash", r#"{"command":"ls -la"}"#)],
        );
        assert!(
            tracker.count_message_tokens(&[with_call]) > tracker.count_message_tokens(&[plain])
        );
    }

    #[test]
    fn percentage_left_is_stable_and_clamped() {
        let tracker = TokenBudgetTracker::new("m", 100);
        let within = vec![Message::user("a".repeat(200))];
        // 50 content + 1 role + 4 structure + 3 priming = 58 of 100
        assert_eq!(tracker.percentage_left(&within), 42);

        let overflowing = vec![Message::user("a".repeat(1000))];
        assert_eq!(tracker.percentage_left(&overflowing), tracker.percentage_left(&overflowing));
        assert_eq!(tracker.percentage_left(&overflowing), 0);

        let roomy = TokenBudgetTracker::default();
        assert_eq!(roomy.percentage_left(&[Message::user("hi")]), 100);
    }
}
