//! LLM client: the single point of entry for all chat-completion calls.
//!
//! ARCHITECTURAL RULE: No other module may call the provider API directly.
//! Interview turns and feedback both go through `ChatProvider`, which
//! `AppState` carries as `Arc<dyn ChatProvider>`.
//!
//! No retries: a failed call is reported to the caller as-is.
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;
pub mod sse;
#[cfg(test)]
pub mod scripted;

use sse::SseDecoder;

const CONNECT_TIMEOUT_SECS: u64 = 15;
/// Upper bound for the non-streamed feedback call.
const COMPLETION_TIMEOUT_SECS: u64 = 120;
const STREAM_DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Role tag understood by the chat-completions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Incremental text output of a streamed call. Ends when the provider is done.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Provider seam. Implement this to swap backends without touching the
/// interview state machine or the HTTP handlers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Starts a streamed completion. Errors before the first byte surface here;
    /// errors mid-stream surface as `Err` items.
    async fn stream_chat(&self, model: &str, messages: &[ChatMessage])
        -> Result<ChunkStream, LlmError>;

    /// Runs a single non-streamed completion and returns its text.
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// One decoded `data:` frame of a streamed completion.
#[derive(Debug, PartialEq)]
enum StreamFrame {
    Delta(Option<String>),
    Done,
}

fn parse_stream_frame(payload: &str) -> Result<StreamFrame, LlmError> {
    if payload.trim() == STREAM_DONE_MARKER {
        return Ok(StreamFrame::Done);
    }
    let chunk: CompletionChunk = serde_json::from_str(payload)?;
    let delta = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content);
    Ok(StreamFrame::Delta(delta))
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI client
// ────────────────────────────────────────────────────────────────────────────

/// Chat-completions client for the OpenAI API (or any compatible base URL).
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: impl Into<String>) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(
        &self,
        body: &CompletionRequest<'_>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, LlmError> {
        let mut request = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn stream_chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ChunkStream, LlmError> {
        let body = CompletionRequest {
            model,
            messages,
            stream: true,
        };
        let response = self.send(&body, None).await?;
        debug!("Streaming completion opened (model: {model})");
        Ok(decode_completion_stream(response.bytes_stream()))
    }

    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let body = CompletionRequest {
            model,
            messages,
            stream: false,
        };
        let response = self
            .send(&body, Some(Duration::from_secs(COMPLETION_TIMEOUT_SECS)))
            .await?;
        let completion: CompletionResponse = response.json().await?;

        if let Some(usage) = &completion.usage {
            debug!(
                "Completion succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

struct DecodeState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: std::collections::VecDeque<Result<String, LlmError>>,
    finished: bool,
}

/// Turns a raw SSE byte stream into text deltas. Frames without content
/// (role announcements, finish markers) are skipped.
fn decode_completion_stream<S, B>(bytes: S) -> ChunkStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        pending: Default::default(),
        finished: false,
    };

    let stream = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            let payloads = match state.bytes.next().await {
                Some(Ok(buf)) => state.decoder.push(buf.as_ref()),
                Some(Err(e)) => {
                    state.finished = true;
                    state.pending.push_back(Err(LlmError::Http(e)));
                    continue;
                }
                None => {
                    state.finished = true;
                    state.decoder.finish()
                }
            };

            for payload in payloads {
                match parse_stream_frame(&payload) {
                    Ok(StreamFrame::Delta(Some(text))) if !text.is_empty() => {
                        state.pending.push_back(Ok(text))
                    }
                    Ok(StreamFrame::Delta(_)) => {}
                    Ok(StreamFrame::Done) => {
                        state.finished = true;
                        break;
                    }
                    Err(e) => {
                        state.finished = true;
                        state.pending.push_back(Err(e));
                        break;
                    }
                }
            }
        }
    });

    Box::pin(stream)
}
