//! Chat-completions client for OpenAI-compatible servers

use super::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ProviderConfig,
    ProviderError, StreamChunk, StreamReceiver, Usage, DEFAULT_BASE_URL, DEFAULT_MODEL,
    DEFAULT_TIMEOUT_SECS,
};
use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, trace};

pub struct OpenAIProvider {
    client: Client,
    config: ProviderConfig,
}

impl OpenAIProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::InvalidRequest(format!("cannot build HTTP client: {}", e))
            })?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest, stream: bool) -> wire::ChatRequest<'a> {
        wire::ChatRequest {
            model: request.model.as_deref().unwrap_or(self.default_model()),
            messages: &request.messages,
            temperature: request.temperature.or(self.config.temperature),
            stream,
            stream_options: stream.then_some(wire::StreamOptions {
                include_usage: true,
            }),
        }
    }

    async fn post(&self, body: &wire::ChatRequest<'_>) -> Result<Response, ProviderError> {
        debug!(
            model = body.model,
            messages = body.messages.len(),
            stream = body.stream,
            "chat completion"
        );

        let mut builder = self.client.post(self.endpoint()).json(body);
        if let Some(key) = self.config.api_key.as_deref().filter(|k| !k.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                ProviderError::Unavailable(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let message = response.text().await.unwrap_or_default();
        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationFailed,
            StatusCode::SERVICE_UNAVAILABLE => ProviderError::Unavailable(message),
            _ => ProviderError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let response = self.post(&self.body(&request, false)).await?;
        let reply: wire::ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let choice = reply
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Empty("no choices".into()))?;

        Ok(CompletionResponse {
            id: reply.id,
            model: reply.model,
            content: choice.message.content,
            finish_reason: FinishReason::from_wire(choice.finish_reason.as_deref()),
            usage: reply.usage.unwrap_or_default(),
        })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<StreamReceiver, ProviderError> {
        let response = self.post(&self.body(&request, true)).await?;
        Ok(StreamReceiver::new(event_stream(response.bytes_stream())))
    }
}

/// Turn a server-sent-event body into stream chunks.
///
/// Text is forwarded as it arrives. The finish reason and the usage-only
/// event that follows it are held until `[DONE]` (or the connection
/// closing) and reported together in the final `Done`.
fn event_stream<S, B, E>(bytes: S) -> impl Stream<Item = StreamChunk> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    async_stream::stream! {
        futures_util::pin_mut!(bytes);
        let mut lines = EventLines::default();
        let mut finish_reason = None;
        let mut usage = None;

        while let Some(received) = bytes.next().await {
            let received = match received {
                Ok(received) => received,
                Err(e) => {
                    yield StreamChunk::Error(e.to_string());
                    return;
                }
            };
            for payload in lines.feed(received.as_ref()) {
                for event in decode_event(&payload) {
                    match event {
                        Event::Text(text) => yield StreamChunk::Text(text),
                        Event::Finished(reason) => finish_reason = Some(reason),
                        Event::Usage(reported) => usage = Some(reported),
                        Event::End => {
                            yield StreamChunk::Done {
                                finish_reason: finish_reason.unwrap_or(FinishReason::Stop),
                                usage,
                            };
                            return;
                        }
                    }
                }
            }
        }

        // Connection closed without [DONE]
        yield StreamChunk::Done {
            finish_reason: finish_reason.unwrap_or(FinishReason::Other),
            usage,
        };
    }
}

/// Reassembles `data:` lines of a server-sent-event body.
///
/// Buffers bytes, not text, so a character split between two network
/// reads is decoded only once both halves are in.
#[derive(Debug, Default)]
struct EventLines {
    pending: Vec<u8>,
}

impl EventLines {
    fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw);
            if let Some(data) = line.trim_end().strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}

/// What one `data:` payload contributes
#[derive(Debug, Clone, PartialEq)]
enum Event {
    Text(String),
    Finished(FinishReason),
    Usage(Usage),
    End,
}

fn decode_event(payload: &str) -> Vec<Event> {
    if payload == "[DONE]" {
        return vec![Event::End];
    }

    let event: wire::StreamEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            trace!(error = %e, payload, "ignoring undecodable event");
            return Vec::new();
        }
    };

    let mut events = Vec::new();
    if let Some(choice) = event.choices.into_iter().next() {
        if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
            events.push(Event::Text(text));
        }
        if let Some(reason) = choice.finish_reason {
            events.push(Event::Finished(FinishReason::from_wire(Some(&reason))));
        }
    }
    if let Some(usage) = event.usage {
        events.push(Event::Usage(usage));
    }
    events
}

/// Request and reply bodies of the chat-completions endpoint
mod wire {
    use super::{ChatMessage, Usage};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct ChatRequest<'a> {
        pub model: &'a str,
        pub messages: &'a [ChatMessage],
        #[serde(skip_serializing_if = "Option::is_none")]
        pub temperature: Option<f32>,
        pub stream: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub stream_options: Option<StreamOptions>,
    }

    #[derive(Debug, Serialize)]
    pub struct StreamOptions {
        pub include_usage: bool,
    }

    #[derive(Debug, Deserialize)]
    pub struct ChatResponse {
        #[serde(default)]
        pub id: String,
        #[serde(default)]
        pub model: String,
        pub choices: Vec<Choice>,
        pub usage: Option<Usage>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Choice {
        pub message: Reply,
        pub finish_reason: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Reply {
        #[serde(default)]
        pub content: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct StreamEvent {
        #[serde(default)]
        pub choices: Vec<StreamChoice>,
        pub usage: Option<Usage>,
    }

    #[derive(Debug, Deserialize)]
    pub struct StreamChoice {
        #[serde(default)]
        pub delta: Delta,
        pub finish_reason: Option<String>,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct Delta {
        pub content: Option<String>,
    }
}
