//! Incremental responses

use super::types::{FinishReason, Usage};
use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

/// One event of a streamed response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A text fragment, in arrival order
    Text(String),
    Done {
        finish_reason: FinishReason,
        usage: Option<Usage>,
    },
    /// The stream broke; nothing follows
    Error(String),
}

/// The fragments of one response. Consumed once; cannot be restarted.
pub struct StreamReceiver {
    chunks: Pin<Box<dyn Stream<Item = StreamChunk> + Send>>,
}

impl StreamReceiver {
    pub fn new<S>(chunks: S) -> Self
    where
        S: Stream<Item = StreamChunk> + Send + 'static,
    {
        Self {
            chunks: Box::pin(chunks),
        }
    }

    /// A receiver replaying chunks that are already in memory
    pub fn from_chunks(chunks: Vec<StreamChunk>) -> Self {
        Self::new(futures_util::stream::iter(chunks))
    }

    pub async fn next_chunk(&mut self) -> Option<StreamChunk> {
        self.chunks.next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_arrive_in_order_then_end() {
        let mut receiver = StreamReceiver::from_chunks(vec![
            StreamChunk::Text("Hello, ".into()),
            StreamChunk::Text("world".into()),
            StreamChunk::Done {
                finish_reason: FinishReason::Stop,
                usage: Some(Usage {
                    prompt_tokens: 2,
                    completion_tokens: 3,
                    total_tokens: 5,
                }),
            },
        ]);

        assert_eq!(receiver.next_chunk().await, Some(StreamChunk::Text("Hello, ".into())));
        assert_eq!(receiver.next_chunk().await, Some(StreamChunk::Text("world".into())));
        assert!(matches!(
            receiver.next_chunk().await,
            Some(StreamChunk::Done { usage: Some(u), .. }) if u.total_tokens == 5
        ));
        assert_eq!(receiver.next_chunk().await, None);
    }
}
