//! Scripted `ChatProvider` for tests. Replays canned chunks and records
//! every request it receives.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use super::{ChatMessage, ChatProvider, ChunkStream, LlmError};

/// One scripted reply to a `stream_chat` call.
pub enum ScriptedTurn {
    Chunks(Vec<&'static str>),
    /// Emits the chunks, cancelling `token` right after chunk `after` is yielded.
    CancelAfter {
        chunks: Vec<&'static str>,
        after: usize,
        token: CancellationToken,
    },
    /// Emits the chunks, then never yields again. Ends only by a stop.
    Stall(Vec<&'static str>),
    /// Emits the chunks, then fails mid-stream.
    FailAfter(Vec<&'static str>),
    /// Fails before any chunk.
    Refuse,
}

#[derive(Clone, Default)]
pub struct ScriptedProvider {
    turns: Arc<Mutex<VecDeque<ScriptedTurn>>>,
    completion: Arc<Mutex<Option<Result<String, u16>>>>,
    pub requests: Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn(self, turn: ScriptedTurn) -> Self {
        self.turns.lock().unwrap().push_back(turn);
        self
    }

    pub fn with_completion(self, text: &str) -> Self {
        *self.completion.lock().unwrap() = Some(Ok(text.to_string()));
        self
    }

    pub fn with_failing_completion(self, status: u16) -> Self {
        *self.completion.lock().unwrap() = Some(Err(status));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<(String, Vec<ChatMessage>)> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn record(&self, model: &str, messages: &[ChatMessage]) {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), messages.to_vec()));
    }
}

fn provider_down() -> LlmError {
    LlmError::Api {
        status: 503,
        message: "provider unavailable".to_string(),
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChunkStream, LlmError> {
        self.record(model, messages);
        let turn = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedTurn::Chunks(vec!["Tell me more."]));

        let stream: ChunkStream = match turn {
            ScriptedTurn::Chunks(chunks) => {
                Box::pin(stream::iter(chunks.into_iter().map(|c| Ok::<_, LlmError>(c.to_string()))))
            }
            ScriptedTurn::CancelAfter {
                chunks,
                after,
                token,
            } => Box::pin(
                stream::iter(chunks.into_iter().enumerate())
                    .inspect(move |(i, _)| {
                        if *i + 1 == after {
                            token.cancel();
                        }
                    })
                    .map(|(_, c)| Ok::<_, LlmError>(c.to_string())),
            ),
            ScriptedTurn::Stall(chunks) => Box::pin(
                stream::iter(chunks.into_iter().map(|c| Ok::<_, LlmError>(c.to_string())))
                    .chain(stream::pending()),
            ),
            ScriptedTurn::FailAfter(chunks) => Box::pin(
                stream::iter(chunks.into_iter().map(|c| Ok::<_, LlmError>(c.to_string())))
                    .chain(stream::once(async { Err(provider_down()) })),
            ),
            ScriptedTurn::Refuse => return Err(provider_down()),
        };
        Ok(stream)
    }

    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        self.record(model, messages);
        let completion = self.completion.lock().unwrap().clone();
        match completion {
            Some(Ok(text)) => Ok(text),
            Some(Err(status)) => Err(LlmError::Api {
                status,
                message: "completion failed".to_string(),
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}
