//! One interviewer turn: stream the model's reply, checking the stop latch
//! between chunks, then settle the session's phase.

use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, info};

use crate::interview::phase::Phase;
use crate::interview::session::Session;
use crate::interview::stop::StopSignal;
use crate::llm_client::{ChatMessage, ChatProvider, LlmError};

/// Progress of a turn as seen by the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    Chunk { text: String },
    Finished { phase: Phase, candidate_messages: usize },
    Failed { message: String },
}

impl TurnEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TurnEvent::Chunk { .. } => "chunk",
            TurnEvent::Finished { .. } => "finished",
            TurnEvent::Failed { .. } => "failed",
        }
    }
}

/// Runs the turn for the candidate message already appended to `session`.
/// Partial output is kept when the latch stops the stream early.
pub async fn run_turn<F>(
    session: &mut Session,
    provider: &dyn ChatProvider,
    model: &str,
    mut emit: F,
) -> Phase
where
    F: FnMut(TurnEvent),
{
    let stop = session.stop_signal().clone();
    let messages = session.transcript().to_chat_messages();

    let mut reply = String::new();
    let result = stream_reply(provider, model, &messages, &stop, &mut reply, &mut emit).await;
    session.record_interviewer_reply(reply);

    match result {
        Ok(()) => {
            let phase = session.finish_turn();
            info!(
                session_id = %session.id(),
                phase = %phase,
                candidate_messages = session.candidate_count(),
                "Turn finished"
            );
            emit(TurnEvent::Finished {
                phase,
                candidate_messages: session.candidate_count(),
            });
            phase
        }
        Err(e) => {
            let message = format!("Assistant response failed: {e}");
            session.fail(message.clone());
            emit(TurnEvent::Failed { message });
            session.phase()
        }
    }
}

async fn stream_reply<F>(
    provider: &dyn ChatProvider,
    model: &str,
    messages: &[ChatMessage],
    stop: &StopSignal,
    reply: &mut String,
    emit: &mut F,
) -> Result<(), LlmError>
where
    F: FnMut(TurnEvent),
{
    let mut stream = tokio::select! {
        biased;
        _ = stop.raised() => return Ok(()),
        opened = provider.stream_chat(model, messages) => opened?,
    };

    let mut chunks = 0usize;
    loop {
        if stop.is_raised() {
            debug!("Stop raised after {chunks} chunks");
            break;
        }
        let next = tokio::select! {
            biased;
            _ = stop.raised() => break,
            next = stream.next() => next,
        };
        match next {
            Some(Ok(text)) => {
                chunks += 1;
                reply.push_str(&text);
                emit(TurnEvent::Chunk { text });
            }
            Some(Err(e)) => return Err(e),
            None => break,
        }
    }
    Ok(())
}
