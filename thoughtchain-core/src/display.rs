//! Display sink for reasoning progress

use crate::classifier::Classification;
use crate::mindmap::MindMap;
use crate::reformatter::StyledFragment;

/// Everything the controller reports while it works
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    TaskClassified(Classification),
    IterationStarted { iteration: u32, max_iterations: u32 },
    /// A styled piece of the text currently being generated
    Fragment(StyledFragment),
    IterationFinished {
        iteration: u32,
        confidence: f64,
        mind_map: MindMap,
    },
    /// The iteration reported a dead end; iterating goes on
    DeadEnd { iteration: u32 },
    /// The iteration reported a solution; iterating stops
    SolutionFound { iteration: u32 },
    FeedbackApplied(String),
    FinalAnswerStarted,
    FinalAnswerFinished,
}

/// Receives display events; rendering never fails the request.
pub trait DisplaySink: Send {
    fn emit(&mut self, event: DisplayEvent);
}

/// Records events, mostly for tests
impl DisplaySink for Vec<DisplayEvent> {
    fn emit(&mut self, event: DisplayEvent) {
        self.push(event);
    }
}

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn emit(&mut self, _event: DisplayEvent) {}
}
