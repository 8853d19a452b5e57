//! The ordered message log sent to the remote model.

use codeclaw_core::chat::ChatEntry;
use codeclaw_core::message::{Message, Role};
use tracing::debug;

use crate::token::TokenBudgetTracker;

/// Ordered model context plus the tracker that measures it.
#[derive(Debug, Clone)]
pub struct ContextStore {
    messages: Vec<Message>,
    tracker: TokenBudgetTracker,
}

impl ContextStore {
    pub fn new(tracker: TokenBudgetTracker) -> Self {
        Self {
            messages: Vec::new(),
            tracker,
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Ordered snapshot of every message.
    pub fn list(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Messages to send on the next request.
    ///
    /// Identical to [`list`](Self::list) for now; any future compression must
    /// keep order and the leading system message.
    pub fn optimized(&self) -> Vec<Message> {
        self.list()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn first(&self) -> Option<&Message> {
        self.messages.first()
    }

    /// Drop messages. With `keep_system`, a leading system message survives.
    pub fn clear(&mut self, keep_system: bool) {
        let system = if keep_system {
            self.messages
                .first()
                .filter(|m| m.role == Role::System)
                .cloned()
        } else {
            None
        };
        self.messages.clear();
        self.messages.extend(system);
    }

    /// Reseed the context for a new mode.
    ///
    /// Clears everything, inserts `system`, replays `history` (which must
    /// not contain the in-flight user entry) and appends `user`.
    pub fn rebuild(&mut self, system: impl Into<String>, history: &[ChatEntry], user: Message) {
        self.clear(false);
        self.append(Message::system(system));
        self.messages
            .extend(history.iter().filter_map(ChatEntry::to_message));
        self.append(user);
        debug!(messages = self.messages.len(), "Rebuilt model context");
    }

    pub fn tracker(&self) -> &TokenBudgetTracker {
        &self.tracker
    }

    /// Swap the tracker, e.g. after a model change.
    pub fn set_tracker(&mut self, tracker: TokenBudgetTracker) {
        self.tracker = tracker;
    }

    pub fn total_tokens(&self) -> usize {
        self.tracker.count_message_tokens(&self.messages)
    }

    pub fn percentage_left(&self) -> u8 {
        self.tracker.percentage_left(&self.messages)
    }
}
