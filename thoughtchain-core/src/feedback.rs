//! Human-in-the-loop feedback between iterations

use async_trait::async_trait;
use std::collections::VecDeque;

/// What the user answered after an iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Proceed to the next iteration
    Continue,
    /// Stop iterating and produce the final answer
    Finalize,
    /// Free text appended to the next iteration's request context
    Guidance(String),
}

impl Feedback {
    /// Interpret one line of user input
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "continue" | "next" => Feedback::Continue,
            "stop" | "exit" | "finalize" => Feedback::Finalize,
            _ => Feedback::Guidance(trimmed.to_string()),
        }
    }
}

/// Source of feedback after each eligible iteration.
///
/// Implementations that can fail (closed input, read error) should answer
/// [`Feedback::Finalize`].
#[async_trait]
pub trait FeedbackSource: Send {
    async fn feedback(&mut self, iteration: u32) -> Feedback;
}

/// Never interrupts; used when human feedback is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoContinue;

#[async_trait]
impl FeedbackSource for AutoContinue {
    async fn feedback(&mut self, _iteration: u32) -> Feedback {
        Feedback::Continue
    }
}

/// Replays pre-recorded answers, then continues
#[derive(Debug, Clone, Default)]
pub struct ScriptedFeedback {
    answers: VecDeque<Feedback>,
    asked: Vec<u32>,
}

impl ScriptedFeedback {
    pub fn new(answers: impl IntoIterator<Item = Feedback>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Iterations at which feedback was requested
    pub fn asked(&self) -> &[u32] {
        &self.asked
    }
}

#[async_trait]
impl FeedbackSource for ScriptedFeedback {
    async fn feedback(&mut self, iteration: u32) -> Feedback {
        self.asked.push(iteration);
        self.answers.pop_front().unwrap_or(Feedback::Continue)
    }
}
