use super::client::{ByteStream, ChatTransport};
use super::error::ChatError;
use crate::types::ChatRequest;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

pub type LiveChunkSender = mpsc::UnboundedSender<Result<Bytes, ChatError>>;

/// One scripted reply of [`MockChatTransport`].
pub enum MockResponse {
    /// Raw chunks delivered verbatim, then end of stream.
    Chunks(Vec<String>),
    /// Raw chunks followed by a read failure.
    ChunksThenError { chunks: Vec<String>, error: ChatError },
    /// The request itself fails (status, network, missing body).
    Fail(ChatError),
    /// Chunks pushed by the test through a [`LiveChunkSender`]; the stream
    /// ends when the sender is dropped.
    Live(mpsc::UnboundedReceiver<Result<Bytes, ChatError>>),
}

impl MockResponse {
    /// A complete stream with one data line per delta and a `[DONE]` line.
    pub fn deltas(deltas: &[&str]) -> Self {
        let mut chunks: Vec<String> = deltas.iter().map(|delta| delta_line(delta)).collect();
        chunks.push("data: [DONE]\n\n".to_string());
        MockResponse::Chunks(chunks)
    }

    pub fn live() -> (LiveChunkSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, MockResponse::Live(rx))
    }
}

/// `data: {...}\n\n` carrying one chat-completion text delta.
pub fn delta_line(content: &str) -> String {
    let frame = json!({
        "object": "chat.completion.chunk",
        "choices": [{ "index": 0, "delta": { "content": content } }]
    });
    format!("data: {frame}\n\n")
}

#[derive(Clone, Default)]
pub struct MockChatTransport {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl MockChatTransport {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
            requests: Arc::default(),
        }
    }

    pub fn push_response(&self, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn next_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(response) = next else {
            return Err(ChatError::Network(
                "mock transport: no more responses configured".to_string(),
            ));
        };

        match response {
            MockResponse::Chunks(chunks) => Ok(Box::pin(stream::iter(
                chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))),
            ))),
            MockResponse::ChunksThenError { chunks, error } => {
                let items = chunks
                    .into_iter()
                    .map(|chunk| Ok(Bytes::from(chunk)))
                    .chain(std::iter::once(Err(error)));
                Ok(Box::pin(stream::iter(items)))
            }
            MockResponse::Fail(error) => Err(error),
            MockResponse::Live(rx) => Ok(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed()),
        }
    }
}

impl ChatTransport for MockChatTransport {
    fn open_stream<'a>(
        &'a self,
        request: &'a ChatRequest,
    ) -> BoxFuture<'a, Result<ByteStream, ChatError>> {
        let result = self.next_stream(request);
        Box::pin(async move {
            tokio::task::yield_now().await;
            result
        })
    }
}
