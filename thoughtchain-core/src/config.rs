//! Configuration file support
//!
//! Loads config from ~/.thoughtchain/config.toml. Every field has a default,
//! so a partial file (or none at all) is valid.

use crate::classifier::ClassifierStrategy;
use crate::confidence::{
    ConfidenceEstimator, DEFAULT_NORMALIZATION_OFFSET, DEFAULT_NORMALIZATION_SPAN,
    DEFAULT_SELF_EVALUATION_PENALTY,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thoughtchain_error::{Error, ErrorKind, Result};
use thoughtchain_provider::provider::{
    DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
use thoughtchain_provider::ProviderConfig;
use tracing::debug;

pub const DEFAULT_SOLUTION_MARKER: &str = "SOLUTION FOUND:";
pub const DEFAULT_DEAD_END_MARKER: &str = "DEAD END:";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reasoning: ReasoningConfig,
    pub provider: ProviderSettings,
}

/// How the per-iteration confidence is computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceMode {
    /// Keyword score only
    #[default]
    Basic,
    /// Keyword score weighted by iteration budget, answer tally and a
    /// self-evaluation call
    Extended,
}

/// Reasoning loop settings, read once at the start of each request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    pub max_iterations: u32,
    pub confidence_threshold: f64,
    /// Ask for feedback after every n-th iteration
    pub iterations_before_feedback: u32,
    pub human_feedback: bool,
    /// Number of history turns included in each prompt
    pub history_window: usize,
    pub classifier: ClassifierStrategy,
    pub confidence: ConfidenceMode,
    pub stream_final_answer: bool,
    pub solution_marker: String,
    pub dead_end_marker: String,
    pub normalization_offset: f64,
    pub normalization_span: f64,
    pub self_evaluation_penalty: f64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            confidence_threshold: 0.8,
            iterations_before_feedback: 1,
            human_feedback: true,
            history_window: 10,
            classifier: ClassifierStrategy::Heuristic,
            confidence: ConfidenceMode::Basic,
            stream_final_answer: true,
            solution_marker: DEFAULT_SOLUTION_MARKER.to_string(),
            dead_end_marker: DEFAULT_DEAD_END_MARKER.to_string(),
            normalization_offset: DEFAULT_NORMALIZATION_OFFSET,
            normalization_span: DEFAULT_NORMALIZATION_SPAN,
            self_evaluation_penalty: DEFAULT_SELF_EVALUATION_PENALTY,
        }
    }
}

impl ReasoningConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations < 1 {
            return Err(Error::config_invalid(
                "max_iterations",
                "max_iterations must be at least 1",
            ));
        }
        if self.iterations_before_feedback < 1 {
            return Err(Error::config_invalid(
                "iterations_before_feedback",
                "iterations_before_feedback must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::config_invalid(
                "confidence_threshold",
                format!(
                    "confidence_threshold must be within [0, 1], got {}",
                    self.confidence_threshold
                ),
            ));
        }
        if self.history_window == 0 {
            return Err(Error::config_invalid(
                "history_window",
                "history_window must be at least 1",
            ));
        }
        if !(self.normalization_span > 0.0) || !self.normalization_offset.is_finite() {
            return Err(Error::config_invalid(
                "normalization_span",
                "normalization_span must be positive and normalization_offset finite",
            ));
        }
        if !(0.0..=1.0).contains(&self.self_evaluation_penalty) {
            return Err(Error::config_invalid(
                "self_evaluation_penalty",
                "self_evaluation_penalty must be within [0, 1]",
            ));
        }
        if self.solution_marker.trim().is_empty() || self.dead_end_marker.trim().is_empty() {
            return Err(Error::config_invalid(
                "solution_marker",
                "markers must not be empty",
            ));
        }
        Ok(())
    }

    pub fn estimator(&self) -> ConfidenceEstimator {
        ConfidenceEstimator::new(
            self.normalization_offset,
            self.normalization_span,
            self.self_evaluation_penalty,
            self.confidence_threshold,
        )
    }
}

/// Generation service connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ProviderSettings {
    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig::local(
            self.base_url.clone(),
            self.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        )
        .with_api_key(self.api_key.clone())
        .with_temperature(self.temperature)
        .with_timeout(self.timeout_secs)
    }
}

impl Config {
    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;

        toml::from_str(&content).map_err(|e| {
            Error::new(ErrorKind::ConfigInvalid, format!("failed to parse {}", path.display()))
                .with_operation("config::load")
                .with_context("path", path.display().to_string())
                .set_source(e)
        })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            Error::serialization_failed("failed to serialize config")
                .with_operation("config::save")
                .set_source(e)
        })
    }

    /// Write to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|e| Error::from(e).with_context("path", path.display().to_string()))?;
        Ok(())
    }
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".thoughtchain")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.reasoning.max_iterations, 5);
        assert_eq!(config.reasoning.confidence_threshold, 0.8);
        assert_eq!(config.reasoning.history_window, 10);
        assert_eq!(config.provider.base_url, "http://localhost:1234/v1");
        assert!(config.reasoning.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<(&str, Box<dyn Fn(&mut ReasoningConfig)>)> = vec![
            ("max_iterations", Box::new(|c| c.max_iterations = 0)),
            ("iterations_before_feedback", Box::new(|c| c.iterations_before_feedback = 0)),
            ("confidence_threshold", Box::new(|c| c.confidence_threshold = 1.5)),
            ("confidence_threshold", Box::new(|c| c.confidence_threshold = f64::NAN)),
            ("history_window", Box::new(|c| c.history_window = 0)),
            ("normalization_span", Box::new(|c| c.normalization_span = 0.0)),
        ];

        for (field, mutate) in cases {
            let mut config = ReasoningConfig::default();
            mutate(&mut config);
            let err = config.validate().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
            assert!(
                err.context().iter().any(|(k, v)| *k == "field" && v == field),
                "expected field {} in {:?}",
                field,
                err
            );
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[reasoning]\nmax_iterations = 3\nclassifier = \"delegated\"\nconfidence = \"extended\"\n\n[provider]\nmodel = \"qwen\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.reasoning.max_iterations, 3);
        assert_eq!(config.reasoning.classifier, ClassifierStrategy::Delegated);
        assert_eq!(config.reasoning.confidence, ConfidenceMode::Extended);
        assert_eq!(config.reasoning.confidence_threshold, 0.8);
        assert_eq!(config.provider.model.as_deref(), Some("qwen"));
        assert_eq!(config.provider.api_key, "lm-studio");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.reasoning.iterations_before_feedback = 2;
        config.reasoning.solution_marker = "EUREKA:".into();
        tokio_test::assert_ok!(config.save_to(&path));

        let reloaded = tokio_test::assert_ok!(Config::load_from(&path));
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[reasoning\nmax_iterations = ").unwrap();

        let err = tokio_test::assert_err!(Config::load_from(&path));
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_provider_settings_conversion() {
        let settings = ProviderSettings {
            model: Some("llama".into()),
            api_key: "sk-x".into(),
            ..Default::default()
        };
        let config = settings.to_provider_config();
        assert_eq!(config.default_model.as_deref(), Some("llama"));
        assert_eq!(config.api_key.as_deref(), Some("sk-x"));
        assert_eq!(config.timeout_secs, Some(300));
    }

    #[test]
    fn test_config_path() {
        let path = config_path();
        assert!(path.to_string_lossy().contains(".thoughtchain"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
