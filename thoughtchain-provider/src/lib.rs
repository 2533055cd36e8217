//! # thoughtchain-provider
//!
//! Clients for the text-generation service that drives the reasoning loop.
//!
//! ## Core Concepts
//! - **Provider**: Trait-based LLM communication, injectable so tests can
//!   substitute a scripted double
//! - **Streaming**: responses arrive as a [`StreamReceiver`] of text fragments
//! - **Errors**: [`ProviderError`] is mapped into the workspace [`Error`] at
//!   the call site with [`ProviderError::into_error`]

pub mod error;
pub mod provider;

pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    OpenAIProvider, ProviderConfig, ProviderError, Role, StreamChunk, StreamReceiver, Usage,
    UsageTracker,
};
