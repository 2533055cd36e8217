//! Conversation history shared across requests

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use thoughtchain_provider::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One completed turn. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub speaker: Speaker,
    pub text: String,
}

impl ChatTurn {
    pub fn to_message(&self) -> ChatMessage {
        match self.speaker {
            Speaker::User => ChatMessage::user(self.text.clone()),
            Speaker::Assistant => ChatMessage::assistant(self.text.clone()),
        }
    }
}

/// Append-only turn log. Only the most recent turns are read back for
/// prompts; older ones stay stored.
#[derive(Debug, Clone, Default)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user turn and its answer together
    pub fn append_exchange(&mut self, request: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ChatTurn {
            speaker: Speaker::User,
            text: request.into(),
        });
        self.turns.push(ChatTurn {
            speaker: Speaker::Assistant,
            text: answer.into(),
        });
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// The last `window` turns, oldest first
    pub fn recent(&self, window: usize) -> &[ChatTurn] {
        let start = self.turns.len().saturating_sub(window);
        &self.turns[start..]
    }

    /// The last `window` turns as provider messages
    pub fn recent_messages(&self, window: usize) -> Vec<ChatMessage> {
        self.recent(window).iter().map(ChatTurn::to_message).collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// History handle shared between concurrent requests
pub type SharedHistory = Arc<Mutex<ChatHistory>>;

/// Lock the history, recovering from a poisoned lock.
///
/// Every mutation is a pair of pushes done under one guard, so the data is
/// still consistent after a panic elsewhere.
pub fn lock(history: &SharedHistory) -> MutexGuard<'_, ChatHistory> {
    history.lock().unwrap_or_else(|e| e.into_inner())
}
