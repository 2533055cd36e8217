//! # ThoughtChain Core
//!
//! The iterative reasoning controller:
//! 1. Classify the request into a task type with evaluation criteria
//! 2. Ask the model for a round of step-by-step thoughts, streamed
//! 3. Strip emphasis markers, score confidence, outline the thoughts
//! 4. Optionally let the user steer, finalize, or just continue
//! 5. Repeat until confident, finalized, solved, or out of iterations
//! 6. Synthesize one final answer from the whole transcript
//!
//! The generation service is injected as an `Arc<dyn LlmProvider>`; the
//! display and feedback ends are traits so the same loop drives a console,
//! a worker task or a test.

pub mod classifier;
pub mod confidence;
pub mod config;
pub mod controller;
pub mod display;
pub mod feedback;
pub mod history;
pub mod mindmap;
pub mod prompts;
pub mod reformatter;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use classifier::{Classification, ClassifierStrategy, TaskClassifier, TaskType};
pub use confidence::{AnswerTally, ConfidenceEstimator, ConfidenceSignals};
pub use config::{config_path, Config, ConfidenceMode, ProviderSettings, ReasoningConfig};
pub use controller::{Outcome, ReasoningResult, StopReason, ThoughtChain};
pub use display::{DisplayEvent, DisplaySink, NullDisplay};
pub use feedback::{AutoContinue, Feedback, FeedbackSource, ScriptedFeedback};
pub use history::{ChatHistory, ChatTurn, SharedHistory, Speaker};
pub use mindmap::{MindMap, MindMapNode};
pub use reformatter::{StreamReformatter, StyledFragment};
pub use transcript::{ThoughtEntry, Transcript};
