//! Per-request record of thought iterations

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThoughtEntry {
    pub iteration: u32,
    pub text: String,
}

/// Ordered thought iterations of one request.
///
/// Iteration numbers are assigned on push, so they are always contiguous
/// from 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<ThoughtEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the next iteration and return its number
    pub fn push(&mut self, text: impl Into<String>) -> u32 {
        let iteration = self.entries.len() as u32 + 1;
        self.entries.push(ThoughtEntry {
            iteration,
            text: text.into(),
        });
        iteration
    }

    pub fn entries(&self) -> &[ThoughtEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ThoughtEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render as the "previous thought process" block
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("\n\nIteration {}:\n{}", e.iteration, e.text))
            .collect()
    }
}
