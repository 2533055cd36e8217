//! Confidence scoring for thought iterations
//!
//! A keyword heuristic: confidence words push the score up, hedging words
//! push it down, and the difference per word is mapped linearly into
//! [0, 1] so a neutral text lands at 0.5. The extended estimate also
//! weighs the remaining iteration budget, the running answer tally and a
//! self-evaluation rating from the model.

use serde::{Deserialize, Serialize};

pub const CONFIDENCE_WORDS: [&str; 7] = [
    "certain",
    "confident",
    "sure",
    "likely",
    "probable",
    "definitely",
    "undoubtedly",
];

pub const UNCERTAINTY_WORDS: [&str; 7] = [
    "uncertain",
    "unsure",
    "maybe",
    "perhaps",
    "possible",
    "might",
    "could",
];

pub const DEFAULT_NORMALIZATION_OFFSET: f64 = 0.1;
pub const DEFAULT_NORMALIZATION_SPAN: f64 = 0.2;
pub const DEFAULT_SELF_EVALUATION_PENALTY: f64 = 0.9;

/// Running record of how many final answers were judged correct
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerTally {
    pub correct: u32,
    pub total: u32,
}

impl AnswerTally {
    pub fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// `correct / total`, or `None` before any verdict was recorded
    pub fn ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| f64::from(self.correct) / f64::from(self.total))
    }
}

/// Optional inputs to the extended estimate
#[derive(Debug, Clone, Default)]
pub struct ConfidenceSignals {
    pub iteration: u32,
    pub max_iterations: u32,
    pub tally: Option<AnswerTally>,
    /// Already-adjusted self-evaluation rating in [0, 1]
    pub self_evaluation: Option<f64>,
}

/// Keyword counts for a block of text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordCounts {
    pub confident: usize,
    pub uncertain: usize,
    pub total: usize,
}

impl WordCounts {
    /// Keywords count wherever they occur, so "certainly" counts as
    /// "certain" and "uncertain" counts on both sides.
    pub fn of(text: &str) -> Self {
        let lowered = text.to_lowercase();
        WordCounts {
            confident: occurrences(&lowered, &CONFIDENCE_WORDS),
            uncertain: occurrences(&lowered, &UNCERTAINTY_WORDS),
            total: text.split_whitespace().count(),
        }
    }
}

fn occurrences(lowered: &str, words: &[&str]) -> usize {
    words.iter().map(|word| lowered.matches(word).count()).sum()
}

/// Maps thought text to a score in [0, 1]. Never fails.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceEstimator {
    offset: f64,
    span: f64,
    penalty: f64,
    threshold: f64,
}

impl Default for ConfidenceEstimator {
    fn default() -> Self {
        Self {
            offset: DEFAULT_NORMALIZATION_OFFSET,
            span: DEFAULT_NORMALIZATION_SPAN,
            penalty: DEFAULT_SELF_EVALUATION_PENALTY,
            threshold: 0.8,
        }
    }
}

impl ConfidenceEstimator {
    pub fn new(offset: f64, span: f64, penalty: f64, threshold: f64) -> Self {
        Self {
            offset,
            span,
            penalty,
            threshold,
        }
    }

    /// Keyword-only score
    pub fn base_score(&self, text: &str) -> f64 {
        let counts = WordCounts::of(text);
        if counts.total == 0 {
            return 0.0;
        }

        let ratio = (counts.confident as f64 - counts.uncertain as f64) / counts.total as f64;
        bounded((ratio + self.offset) / self.span)
    }

    /// Keyword score weighted by iteration budget, tally and self-evaluation
    pub fn estimate(&self, text: &str, signals: &ConfidenceSignals) -> f64 {
        let base = self.base_score(text);

        let iteration_factor = if signals.max_iterations == 0 {
            0.0
        } else {
            bounded(1.0 - f64::from(signals.iteration) / f64::from(signals.max_iterations))
        };

        let mut score = base * (1.0 + iteration_factor);
        if let Some(ratio) = signals.tally.and_then(|t| t.ratio()) {
            score *= ratio;
        }
        // A zero rating carries no information
        match signals.self_evaluation {
            Some(rating) if rating > 0.0 => score *= rating,
            _ => {}
        }

        bounded(score)
    }

    /// Apply the below-threshold penalty to a raw self-evaluation rating
    pub fn adjust_self_evaluation(&self, raw: f64) -> f64 {
        let rating = bounded(raw);
        if rating < self.threshold {
            bounded(rating * self.penalty)
        } else {
            rating
        }
    }
}

/// Pull the first number out of a self-evaluation reply such as
/// `"0.85"` or `"Score: 0.7."`.
pub fn parse_rating(reply: &str) -> Option<f64> {
    reply
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .map(|t| t.trim_end_matches('.'))
        .filter(|t| !t.is_empty())
        .find_map(|t| t.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn bounded(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
