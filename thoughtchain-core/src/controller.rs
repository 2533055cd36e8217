//! The iterative reasoning controller
//!
//! One request runs through these states:
//!
//! ```text
//! Classifying -> Iterating(1) -> [Feedback(1)] -> Iterating(2) -> ... -> Finalizing -> Done
//! ```
//!
//! Iterating stops early when the confidence passes the threshold, when
//! the user asks to finalize or when an iteration reports a solution. A
//! generation failure aborts the request without touching the history;
//! cancellation ends it cleanly before the next generation call.

use crate::classifier::{Classification, TaskClassifier};
use crate::confidence::{parse_rating, AnswerTally, ConfidenceEstimator, ConfidenceSignals};
use crate::config::{ConfidenceMode, ReasoningConfig};
use crate::display::{DisplayEvent, DisplaySink};
use crate::feedback::{Feedback, FeedbackSource};
use crate::history::{self, ChatHistory, SharedHistory};
use crate::mindmap::MindMap;
use crate::prompts;
use crate::reformatter::{reformat_stream, reformat_text, StyledFragment};
use crate::transcript::Transcript;
use futures_core::Stream;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex};
use thoughtchain_error::Result;
use thoughtchain_provider::{
    ChatMessage, CompletionRequest, LlmProvider, ProviderError, StreamChunk, StreamReceiver, Usage,
    UsageTracker,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why iterating stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ConfidenceReached,
    FeedbackFinalize,
    SolutionFound,
    IterationLimit,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::ConfidenceReached => "confidence_reached",
            StopReason::FeedbackFinalize => "feedback_finalize",
            StopReason::SolutionFound => "solution_found",
            StopReason::IterationLimit => "iteration_limit",
        }
    }
}

/// A completed request
#[derive(Debug, Clone)]
pub struct ReasoningResult {
    pub classification: Classification,
    pub transcript: Transcript,
    /// The request plus any feedback annotations, as sent with the final prompt.
    /// Only the plain request goes into the history.
    pub request_context: String,
    pub final_answer: String,
    pub stop_reason: StopReason,
    pub usage: UsageTracker,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Completed(ReasoningResult),
    /// Stopped by the caller; nothing was added to the history
    Cancelled { iterations_completed: usize },
}

impl Outcome {
    pub fn completed(&self) -> Option<&ReasoningResult> {
        match self {
            Outcome::Completed(result) => Some(result),
            Outcome::Cancelled { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled { .. })
    }
}

/// Drives the reasoning loop for any number of requests.
///
/// Requests may run concurrently; each has its own transcript and
/// reformatter, and they only share the chat history and answer tally.
pub struct ThoughtChain {
    provider: Arc<dyn LlmProvider>,
    config: ReasoningConfig,
    classifier: TaskClassifier,
    estimator: ConfidenceEstimator,
    history: SharedHistory,
    tally: Arc<Mutex<AnswerTally>>,
}

impl ThoughtChain {
    /// Fails with `ConfigInvalid` before anything is sent
    pub fn new(provider: Arc<dyn LlmProvider>, config: ReasoningConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            provider,
            classifier: TaskClassifier::new(config.classifier),
            estimator: config.estimator(),
            config,
            history: Arc::new(Mutex::new(ChatHistory::new())),
            tally: Arc::new(Mutex::new(AnswerTally::default())),
        })
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }

    pub fn history(&self) -> SharedHistory {
        Arc::clone(&self.history)
    }

    /// Record whether the last final answer was right
    pub fn record_verdict(&self, correct: bool) {
        self.tally.lock().unwrap_or_else(|e| e.into_inner()).record(correct);
    }

    pub fn tally(&self) -> AnswerTally {
        *self.tally.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one request on its own task
    pub fn spawn(
        self: &Arc<Self>,
        request: String,
        mut feedback: Box<dyn FeedbackSource>,
        mut display: Box<dyn DisplaySink>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<Outcome>> {
        let chain = Arc::clone(self);
        tokio::spawn(async move {
            chain
                .process(&request, feedback.as_mut(), display.as_mut(), &cancel)
                .await
        })
    }

    /// Run one request to completion
    pub async fn process(
        &self,
        request: &str,
        feedback: &mut dyn FeedbackSource,
        display: &mut dyn DisplaySink,
        cancel: &CancellationToken,
    ) -> Result<Outcome> {
        let config = &self.config;
        config.validate()?;

        if cancel.is_cancelled() {
            return Ok(Outcome::Cancelled {
                iterations_completed: 0,
            });
        }

        let mut usage = UsageTracker::new();
        let classifying = self
            .classifier
            .classify(request, self.provider.as_ref(), &mut usage);
        let classification = tokio::select! {
            _ = cancel.cancelled() => return Ok(cancelled(&Transcript::new())),
            classification = classifying => classification,
        };
        info!(
            task = %classification.task_type,
            criteria = ?classification.evaluation_criteria,
            "request classified"
        );
        display.emit(DisplayEvent::TaskClassified(classification.clone()));

        let mut transcript = Transcript::new();
        let mut request_context = request.to_string();
        let mut stop_reason = StopReason::IterationLimit;

        for iteration in 1..=config.max_iterations {
            if cancel.is_cancelled() {
                return Ok(cancelled(&transcript));
            }
            display.emit(DisplayEvent::IterationStarted {
                iteration,
                max_iterations: config.max_iterations,
            });

            let system = prompts::thought_prompt(
                classification.task_type,
                iteration,
                &config.solution_marker,
                &config.dead_end_marker,
            );
            let previous = transcript.render();
            let messages = prompts::build_messages(
                self.recent_history(),
                &system,
                Some(previous.as_str()),
                &request_context,
            );

            let text = match self
                .stream_text(messages, display, cancel, &mut usage, "controller::iterate")
                .await?
            {
                Some(text) => text,
                None => return Ok(cancelled(&transcript)),
            };
            transcript.push(text.as_str());

            let confidence = self
                .confidence(&text, &transcript, iteration, cancel, &mut usage)
                .await;
            debug!(iteration, confidence, chars = text.len(), "iteration finished");
            display.emit(DisplayEvent::IterationFinished {
                iteration,
                confidence,
                mind_map: MindMap::build(&text),
            });

            if text.contains(config.dead_end_marker.as_str()) {
                display.emit(DisplayEvent::DeadEnd { iteration });
            }
            if text.contains(config.solution_marker.as_str()) {
                display.emit(DisplayEvent::SolutionFound { iteration });
                stop_reason = StopReason::SolutionFound;
                break;
            }
            if confidence > config.confidence_threshold {
                stop_reason = StopReason::ConfidenceReached;
                break;
            }

            if config.human_feedback && iteration % config.iterations_before_feedback == 0 {
                let answer = tokio::select! {
                    _ = cancel.cancelled() => return Ok(cancelled(&transcript)),
                    answer = feedback.feedback(iteration) => answer,
                };
                match answer {
                    Feedback::Continue => {}
                    Feedback::Finalize => {
                        stop_reason = StopReason::FeedbackFinalize;
                        break;
                    }
                    Feedback::Guidance(text) => {
                        debug!(iteration, "feedback applied");
                        request_context.push_str("\n\nUser feedback: ");
                        request_context.push_str(&text);
                        display.emit(DisplayEvent::FeedbackApplied(text));
                    }
                }
            }
        }

        if cancel.is_cancelled() {
            return Ok(cancelled(&transcript));
        }
        info!(
            iterations = transcript.len(),
            reason = stop_reason.as_str(),
            "finalizing"
        );
        display.emit(DisplayEvent::FinalAnswerStarted);

        let system =
            prompts::final_answer_prompt(&transcript.render(), &classification.evaluation_criteria);
        let messages =
            prompts::build_messages(self.recent_history(), &system, None, &request_context);

        let final_answer = if config.stream_final_answer {
            match self
                .stream_text(messages, display, cancel, &mut usage, "controller::finalize")
                .await?
            {
                Some(answer) => answer,
                None => return Ok(cancelled(&transcript)),
            }
        } else {
            self.complete_text(messages, display, &mut usage, "controller::finalize")
                .await?
        };
        display.emit(DisplayEvent::FinalAnswerFinished);

        history::lock(&self.history).append_exchange(request, final_answer.as_str());
        info!(
            calls = usage.total_calls,
            tokens = usage.total_tokens(),
            "request completed"
        );

        Ok(Outcome::Completed(ReasoningResult {
            classification,
            transcript,
            request_context,
            final_answer,
            stop_reason,
            usage,
        }))
    }

    fn recent_history(&self) -> Vec<ChatMessage> {
        history::lock(&self.history).recent_messages(self.config.history_window)
    }

    /// Stream one response through a fresh reformatter.
    ///
    /// Returns `None` when cancelled mid-way; the partial text is dropped.
    async fn stream_text(
        &self,
        messages: Vec<ChatMessage>,
        display: &mut dyn DisplaySink,
        cancel: &CancellationToken,
        usage: &mut UsageTracker,
        operation: &'static str,
    ) -> Result<Option<String>> {
        let request = CompletionRequest::new(messages).with_streaming(true);
        let mut receiver = tokio::select! {
            _ = cancel.cancelled() => return Ok(None),
            receiver = self.provider.stream(request) => {
                receiver.map_err(|e| e.into_error(operation))?
            }
        };

        let mut end = StreamEnd::Closed;
        let mut text = String::new();
        {
            let styled = reformat_stream(text_fragments(&mut receiver, &mut end));
            futures_util::pin_mut!(styled);
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => return Ok(None),
                    next = styled.next() => next,
                };
                match next {
                    Some(fragment) => show(fragment, &mut text, display),
                    None => break,
                }
            }
        }

        let reported = match end {
            StreamEnd::Broken(message) => {
                return Err(ProviderError::Stream(message).into_error(operation));
            }
            StreamEnd::Done(reported) => reported,
            StreamEnd::Closed => None,
        };
        usage.track(self.provider.default_model(), &reported.unwrap_or_default());
        Ok(Some(text))
    }

    /// Non-streamed variant, reformatted the same way
    async fn complete_text(
        &self,
        messages: Vec<ChatMessage>,
        display: &mut dyn DisplaySink,
        usage: &mut UsageTracker,
        operation: &'static str,
    ) -> Result<String> {
        let response = self
            .provider
            .complete(CompletionRequest::new(messages))
            .await
            .map_err(|e| e.into_error(operation))?;
        usage.track(&response.model, &response.usage);

        let mut text = String::new();
        for styled in reformat_text(response.content.as_deref().unwrap_or_default()) {
            show(styled, &mut text, display);
        }
        Ok(text)
    }

    async fn confidence(
        &self,
        text: &str,
        transcript: &Transcript,
        iteration: u32,
        cancel: &CancellationToken,
        usage: &mut UsageTracker,
    ) -> f64 {
        match self.config.confidence {
            ConfidenceMode::Basic => self.estimator.base_score(text),
            ConfidenceMode::Extended => {
                let rendered = transcript.render();
                let self_evaluation = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    rating = self.self_evaluate(&rendered, usage) => rating,
                };
                let signals = ConfidenceSignals {
                    iteration,
                    max_iterations: self.config.max_iterations,
                    tally: Some(self.tally()),
                    self_evaluation,
                };
                self.estimator.estimate(text, &signals)
            }
        }
    }

    /// Ask the service to rate the thought process; `None` when it cannot
    async fn self_evaluate(&self, thought_process: &str, usage: &mut UsageTracker) -> Option<f64> {
        let request = CompletionRequest::new(vec![ChatMessage::user(
            prompts::self_evaluation_prompt(thought_process),
        )]);

        let response = match self.provider.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "self-evaluation failed, ignoring it");
                return None;
            }
        };
        usage.track(&response.model, &response.usage);

        match response.content.as_deref().and_then(parse_rating) {
            Some(raw) => Some(self.estimator.adjust_self_evaluation(raw)),
            None => {
                warn!("self-evaluation reply has no rating, ignoring it");
                None
            }
        }
    }
}

/// How a streamed response ended
enum StreamEnd {
    Closed,
    Done(Option<Usage>),
    Broken(String),
}

/// The text fragments of a response up to `Done` or the first error
fn text_fragments<'a>(
    receiver: &'a mut StreamReceiver,
    end: &'a mut StreamEnd,
) -> impl Stream<Item = String> + 'a {
    async_stream::stream! {
        while let Some(chunk) = receiver.next_chunk().await {
            match chunk {
                StreamChunk::Text(fragment) => yield fragment,
                StreamChunk::Done { usage, .. } => {
                    *end = StreamEnd::Done(usage);
                    break;
                }
                StreamChunk::Error(message) => {
                    *end = StreamEnd::Broken(message);
                    break;
                }
            }
        }
    }
}

fn show(styled: StyledFragment, text: &mut String, display: &mut dyn DisplaySink) {
    text.push_str(&styled.text);
    display.emit(DisplayEvent::Fragment(styled));
}

fn cancelled(transcript: &Transcript) -> Outcome {
    info!(iterations = transcript.len(), "request cancelled");
    Outcome::Cancelled {
        iterations_completed: transcript.len(),
    }
}
