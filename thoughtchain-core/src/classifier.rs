//! Task classification
//!
//! Maps a user request to a [`TaskType`] and its evaluation criteria,
//! either with keyword counts or by asking the generation service. Both
//! strategies degrade to defaults instead of failing.

use crate::prompts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thoughtchain_provider::{ChatMessage, CompletionRequest, LlmProvider, UsageTracker};
use tracing::{debug, warn};

/// Criteria used when delegated classification cannot be parsed
pub const FALLBACK_CRITERIA: [&str; 3] = ["relevance", "clarity", "feasibility"];

/// The closed set of task categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    ProductDevelopment,
    ScientificResearch,
    CreativeWriting,
    Coding,
    General,
}

impl TaskType {
    pub const ALL: [TaskType; 5] = [
        TaskType::ProductDevelopment,
        TaskType::ScientificResearch,
        TaskType::CreativeWriting,
        TaskType::Coding,
        TaskType::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::ProductDevelopment => "product_development",
            TaskType::ScientificResearch => "scientific_research",
            TaskType::CreativeWriting => "creative_writing",
            TaskType::Coding => "coding",
            TaskType::General => "general",
        }
    }

    /// Fixed evaluation criteria for this task type
    pub fn criteria(&self) -> &'static [&'static str] {
        match self {
            TaskType::ProductDevelopment => {
                &["market viability", "innovation", "user needs", "feasibility"]
            }
            TaskType::ScientificResearch => &[
                "methodological rigor",
                "evidence quality",
                "reproducibility",
                "significance",
            ],
            TaskType::CreativeWriting => &[
                "originality",
                "narrative coherence",
                "character depth",
                "emotional impact",
            ],
            TaskType::Coding => &["correctness", "efficiency", "readability", "maintainability"],
            TaskType::General => &["clarity", "relevance", "accuracy", "completeness"],
        }
    }

    /// Keywords counted by the heuristic; `general` has none
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            TaskType::ProductDevelopment => &[
                "product", "market", "launch", "startup", "customer", "business", "pricing",
                "mvp", "feature",
            ],
            TaskType::ScientificResearch => &[
                "research", "hypothes", "experiment", "study", "scientific", "theory",
                "evidence", "laboratory",
            ],
            TaskType::CreativeWriting => &[
                "story", "poem", "poetry", "novel", "character", "plot", "fiction", "narrative",
                "creative",
            ],
            TaskType::Coding => &[
                "code", "coding", "function", "bug", "compile", "algorithm", "programming",
                "python", "software", "implement",
            ],
            TaskType::General => &[],
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    /// Lenient: accepts `Product Development`, `[coding]`, `creative-writing`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim_matches(|c: char| {
                c.is_whitespace() || matches!(c, '[' | ']' | '"' | '\'' | '*' | '`' | '.')
            })
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();

        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown task type '{}'", s.trim()))
    }
}

/// The result of classifying one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub task_type: TaskType,
    pub evaluation_criteria: Vec<String>,
}

impl Classification {
    /// A task type with its own fixed criteria
    pub fn for_task(task_type: TaskType) -> Self {
        Self {
            task_type,
            evaluation_criteria: task_type.criteria().iter().map(|c| c.to_string()).collect(),
        }
    }

    /// What delegated classification degrades to
    pub fn fallback() -> Self {
        Self {
            task_type: TaskType::General,
            evaluation_criteria: FALLBACK_CRITERIA.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// How requests get classified
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierStrategy {
    /// Keyword counts, no service call
    #[default]
    Heuristic,
    /// One non-streamed classification call
    Delegated,
}

/// Stateless classifier; `classify` never mutates shared state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskClassifier {
    strategy: ClassifierStrategy,
}

impl TaskClassifier {
    pub fn new(strategy: ClassifierStrategy) -> Self {
        Self { strategy }
    }

    pub async fn classify(
        &self,
        request: &str,
        provider: &dyn LlmProvider,
        usage: &mut UsageTracker,
    ) -> Classification {
        match self.strategy {
            ClassifierStrategy::Heuristic => classify_heuristic(request),
            ClassifierStrategy::Delegated => classify_delegated(request, provider, usage).await,
        }
    }
}

/// Keyword heuristic: strictly highest count wins, anything else is `general`
pub fn classify_heuristic(request: &str) -> Classification {
    let lowered = request.to_lowercase();

    let mut best: Option<(TaskType, usize)> = None;
    let mut tied = false;
    for task in TaskType::ALL {
        let score: usize = task
            .keywords()
            .iter()
            .map(|kw| lowered.matches(kw).count())
            .sum();
        if score == 0 {
            continue;
        }
        match best {
            Some((_, top)) if score == top => tied = true,
            Some((_, top)) if score < top => {}
            _ => {
                best = Some((task, score));
                tied = false;
            }
        }
    }

    let task_type = match best {
        Some((task, _)) if !tied => task,
        _ => TaskType::General,
    };
    debug!(task = %task_type, tied, "heuristic classification");
    Classification::for_task(task_type)
}

/// Ask the generation service; degrade to [`Classification::fallback`]
/// on any failure.
pub async fn classify_delegated(
    request: &str,
    provider: &dyn LlmProvider,
    usage: &mut UsageTracker,
) -> Classification {
    let completion = CompletionRequest::new(vec![
        ChatMessage::system(prompts::CLASSIFICATION_PROMPT),
        ChatMessage::user(request),
    ]);

    let response = match provider.complete(completion).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "classification call failed, using defaults");
            return Classification::fallback();
        }
    };
    usage.track(&response.model, &response.usage);

    match response.content.as_deref().and_then(parse_classification) {
        Some(classification) => classification,
        None => {
            warn!("unparsable classification reply, using defaults");
            Classification::fallback()
        }
    }
}

/// Parse the two-line `Task Type:` / `Evaluation Criteria:` reply
pub fn parse_classification(reply: &str) -> Option<Classification> {
    let mut task_line = None;
    let mut criteria_line = None;

    for line in reply.lines() {
        let line = line.trim().trim_start_matches(['-', '*', '#', ' ']);
        if let Some(value) = strip_label(line, "task type:") {
            task_line.get_or_insert(value);
        } else if let Some(value) = strip_label(line, "evaluation criteria:") {
            criteria_line.get_or_insert(value);
        }
    }

    if task_line.is_none() && criteria_line.is_none() {
        return None;
    }

    let task_type = match task_line.map(str::parse::<TaskType>) {
        Some(Ok(task)) => task,
        Some(Err(e)) => {
            debug!(error = %e, "falling back to general task type");
            TaskType::General
        }
        None => TaskType::General,
    };

    let criteria: Vec<String> = criteria_line
        .unwrap_or_default()
        .trim()
        .trim_matches(['[', ']'])
        .split(',')
        .map(|c| c.trim().trim_matches(['*', '.']).trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    let evaluation_criteria = if criteria.is_empty() {
        FALLBACK_CRITERIA.iter().map(|c| c.to_string()).collect()
    } else {
        criteria
    };

    Some(Classification {
        task_type,
        evaluation_criteria,
    })
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label).then(|| line[label.len()..].trim())
}
