// Conversation history manager for multi-turn interactions

use crate::providers::types::{ChatMessage, Role};

/// Maximum retained user/assistant turns.
pub const MAX_TURNS: usize = 10;

/// Bounded conversation history: one leading system message plus up to
/// `MAX_TURNS` user/assistant pairs.
///
/// Owned exclusively by the active session and never persisted. Trimming
/// drops the two oldest non-system entries at a time, so the system message
/// survives indefinitely and a well-formed history keeps an even number of
/// non-system entries. A failed turn's lone user message stays in history
/// and occupies a trim slot like any other entry.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
    max_turns: usize,
}

impl ConversationHistory {
    /// History seeded with the fixed system prompt.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self::with_max_turns(system_prompt, MAX_TURNS)
    }

    pub fn with_max_turns(system_prompt: impl Into<String>, max_turns: usize) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            max_turns,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
        self.trim();
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
        self.trim();
    }

    /// The full ordered sequence, system message first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Drop everything except the system prompt.
    pub fn clear(&mut self) {
        self.messages.truncate(1);
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Completed user/assistant pairs.
    pub fn turn_count(&self) -> usize {
        (self.messages.len() - 1) / 2
    }

    fn trim(&mut self) {
        let cap = 1 + 2 * self.max_turns;
        while self.messages.len() > cap && self.messages.len() >= 3 {
            // Remove the two oldest non-system entries as a unit; index 0
            // is the system message and is never dropped
            self.messages.drain(1..3);
        }
    }
}
