//! # Generation service
//!
//! [`LlmProvider`] is the seam between the reasoning loop and whatever
//! produces text. [`OpenAIProvider`] speaks the chat-completions protocol
//! used by OpenAI, LM Studio, vLLM and Ollama; tests plug in their own.

mod openai;
mod stream;
mod types;

pub use openai::OpenAIProvider;
pub use stream::{StreamChunk, StreamReceiver};
pub use types::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, Role, Usage, UsageTracker,
};

use async_trait::async_trait;
use std::fmt;

/// LM Studio's local server
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234/v1";
/// Local servers accept any key; LM Studio documents this one
pub const DEFAULT_API_KEY: &str = "lm-studio";
pub const DEFAULT_MODEL: &str = "local-model";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug)]
pub enum ProviderError {
    /// The request never got an answer
    Network(String),
    /// Non-success HTTP status
    Api { status: u16, message: String },
    /// The answer could not be decoded
    Parse(String),
    RateLimited { retry_after: Option<u64> },
    InvalidRequest(String),
    /// Connection refused or 503
    Unavailable(String),
    AuthenticationFailed,
    /// The stream broke after it started
    Stream(String),
    /// A well-formed answer with nothing usable in it
    Empty(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Api { status, message } => write!(f, "service returned {}: {}", status, message),
            Self::Parse(e) => write!(f, "undecodable reply: {}", e),
            Self::RateLimited {
                retry_after: Some(secs),
            } => write!(f, "rate limited, retry after {}s", secs),
            Self::RateLimited { retry_after: None } => write!(f, "rate limited"),
            Self::InvalidRequest(e) => write!(f, "invalid request: {}", e),
            Self::Unavailable(e) => write!(f, "service unavailable: {}", e),
            Self::AuthenticationFailed => write!(f, "credentials rejected"),
            Self::Stream(e) => write!(f, "stream broke: {}", e),
            Self::Empty(e) => write!(f, "empty reply: {}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Produces text for role-tagged messages, whole or as a fragment stream.
///
/// Implementations must be shareable across concurrent reasoning requests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    /// The model used when a request does not name one
    fn default_model(&self) -> &str;

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Start a streamed response. Errors here mean nothing was received;
    /// later failures arrive as [`StreamChunk::Error`].
    async fn stream(&self, request: CompletionRequest) -> Result<StreamReceiver, ProviderError>;
}

/// Connection settings for [`OpenAIProvider`]
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    /// An empty key sends no `Authorization` header
    pub api_key: Option<String>,
    pub default_model: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// A local OpenAI-compatible server
    pub fn local(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            api_key: Some(DEFAULT_API_KEY.into()),
            default_model: Some(model.into()),
            temperature: Some(DEFAULT_TEMPERATURE),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::local(DEFAULT_BASE_URL, DEFAULT_MODEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_local_server() {
        let config = ProviderConfig::default();
        assert_eq!(config.base_url.as_deref(), Some(DEFAULT_BASE_URL));
        assert_eq!(config.api_key.as_deref(), Some(DEFAULT_API_KEY));
        assert_eq!(config.timeout_secs, Some(DEFAULT_TIMEOUT_SECS));

        let config = config.with_model("qwen").with_api_key("");
        assert_eq!(config.default_model.as_deref(), Some("qwen"));
        assert_eq!(config.api_key.as_deref(), Some(""));
    }

    #[test]
    fn test_error_messages() {
        let err = ProviderError::RateLimited {
            retry_after: Some(3),
        };
        assert_eq!(err.to_string(), "rate limited, retry after 3s");

        let err = ProviderError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "service returned 500: boom");
    }
}
