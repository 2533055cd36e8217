//! In-memory generation service for tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use thoughtchain_provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmProvider, ProviderError, Role,
    StreamChunk, StreamReceiver, Usage,
};

/// Usage reported for every scripted reply, streamed or not
pub const REPLY_USAGE: Usage = Usage {
    prompt_tokens: 1,
    completion_tokens: 1,
    total_tokens: 2,
};

enum Reply {
    Fragments(Vec<String>),
    Fail(String),
    /// Fragments, then an error chunk
    Broken(Vec<String>, String),
    /// One fragment, then never finishes
    Hang(String),
}

/// Answers requests from a script, in order, whether they are streamed or
/// not. An exhausted script either fails or echoes the last user message.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
    echo: bool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply `"echo: <last user message>"` once the script runs out
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    pub fn with_completion(self, text: &str) -> Self {
        self.with_fragments(&[text])
    }

    pub fn with_fragments(self, fragments: &[&str]) -> Self {
        self.push(Reply::Fragments(fragments.iter().map(|f| f.to_string()).collect()))
    }

    pub fn with_completion_error(self, message: &str) -> Self {
        self.push(Reply::Fail(message.to_string()))
    }

    pub fn with_broken_stream(self, fragments: &[&str], message: &str) -> Self {
        self.push(Reply::Broken(
            fragments.iter().map(|f| f.to_string()).collect(),
            message.to_string(),
        ))
    }

    pub fn with_hanging_stream(self, first: &str) -> Self {
        self.push(Reply::Hang(first.to_string()))
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    fn next_reply(&self, request: &CompletionRequest) -> Reply {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        if self.echo {
            let last_user = request
                .messages
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Reply::Fragments(vec![format!("echo: {}", last_user)])
        } else {
            Reply::Fail("script exhausted".to_string())
        }
    }
}

fn api_error(message: String) -> ProviderError {
    ProviderError::Api {
        status: 500,
        message,
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let content = match self.next_reply(&request) {
            Reply::Fragments(fragments) => fragments.concat(),
            Reply::Fail(message) | Reply::Broken(_, message) => return Err(api_error(message)),
            Reply::Hang(first) => first,
        };

        Ok(CompletionResponse {
            id: "scripted".into(),
            model: self.default_model().into(),
            content: Some(content),
            finish_reason: FinishReason::Stop,
            usage: REPLY_USAGE,
        })
    }

    async fn stream(&self, request: CompletionRequest) -> Result<StreamReceiver, ProviderError> {
        let done = StreamChunk::Done {
            finish_reason: FinishReason::Stop,
            usage: Some(REPLY_USAGE),
        };

        match self.next_reply(&request) {
            Reply::Fragments(fragments) => {
                let mut chunks: Vec<StreamChunk> =
                    fragments.into_iter().map(StreamChunk::Text).collect();
                chunks.push(done);
                Ok(StreamReceiver::from_chunks(chunks))
            }
            Reply::Fail(message) => Err(api_error(message)),
            Reply::Broken(fragments, message) => {
                let mut chunks: Vec<StreamChunk> =
                    fragments.into_iter().map(StreamChunk::Text).collect();
                chunks.push(StreamChunk::Error(message));
                Ok(StreamReceiver::from_chunks(chunks))
            }
            Reply::Hang(first) => Ok(StreamReceiver::new(async_stream::stream! {
                yield StreamChunk::Text(first);
                futures_util::future::pending::<()>().await;
            })),
        }
    }
}
