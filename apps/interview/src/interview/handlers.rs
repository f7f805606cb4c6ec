use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::feedback::generate_feedback;
use crate::interview::profile::{
    CandidateProfile, Level, COMPANIES, EXPERIENCE_MAX_CHARS, NAME_MAX_CHARS, POSITIONS,
    SKILLS_MAX_CHARS,
};
use crate::interview::session::{SessionSnapshot, MAX_CANDIDATE_MESSAGES, MESSAGE_MAX_CHARS};
use crate::interview::store::SessionHandle;
use crate::interview::turn::{run_turn, TurnEvent};
use crate::state::AppState;

const TRANSCRIPT_FILENAME: &str = "interview_transcript.txt";

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub levels: Vec<&'static str>,
    pub positions: &'static [&'static str],
    pub companies: &'static [&'static str],
    pub max_candidate_messages: usize,
    pub message_max_chars: usize,
    pub name_max_chars: usize,
    pub experience_max_chars: usize,
    pub skills_max_chars: usize,
    pub interview_model: String,
}

async fn session_handle(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))
}

/// GET /api/v1/options
pub async fn handle_options(State(state): State<AppState>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        levels: Level::ALL.iter().map(|l| l.label()).collect(),
        positions: POSITIONS,
        companies: COMPANIES,
        max_candidate_messages: MAX_CANDIDATE_MESSAGES,
        message_max_chars: MESSAGE_MAX_CHARS,
        name_max_chars: NAME_MAX_CHARS,
        experience_max_chars: EXPERIENCE_MAX_CHARS,
        skills_max_chars: SKILLS_MAX_CHARS,
        interview_model: state.config.interview_model.clone(),
    })
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionSnapshot>) {
    let handle = state.sessions.create().await;
    let snapshot = handle.session.lock().await.snapshot();
    (StatusCode::CREATED, Json(snapshot))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = session_handle(&state, id).await?;
    let session = handle.session.lock().await;
    Ok(Json(session.snapshot()))
}

/// DELETE /api/v1/sessions/:id
/// Restart: any running turn is stopped and the session dropped.
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handle = session_handle(&state, id).await?;
    handle.stop.raise();
    state.sessions.remove(id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/setup
pub async fn handle_setup(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(profile): Json<CandidateProfile>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut session = handle.session.lock().await;
    session.begin(profile)?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/messages
///
/// Validates and records the candidate message, then streams the
/// interviewer's reply as SSE `chunk` events followed by one `finished`
/// or `failed` event. The session stays locked until the turn settles.
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MessageRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut session = handle.session.clone().lock_owned().await;
    session.submit_candidate_message(&req.content)?;
    info!(
        session_id = %id,
        candidate_messages = session.candidate_count(),
        "Candidate message received"
    );

    let (tx, rx) = futures::channel::mpsc::unbounded::<TurnEvent>();
    let llm = state.llm.clone();
    let model = state.config.interview_model.clone();
    tokio::spawn(async move {
        run_turn(&mut session, llm.as_ref(), &model, |event| {
            // The page may have gone away; the turn still settles the session.
            let _ = tx.unbounded_send(event);
        })
        .await;
    });

    let stream = rx.filter_map(|event| async move {
        match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().event(event.name()).data(json))),
            Err(e) => {
                warn!("Failed to serialize turn event: {e}");
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /api/v1/sessions/:id/stop
/// Shared by the Stop button and the Escape shortcut.
pub async fn handle_stop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut session = match handle.session.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            // A turn holds the session: raise the latch so it ends at the
            // next chunk, then wait for it to settle. Outside a running
            // interview the latch stays down and `request_stop` decides.
            handle.stop.raise_if_armed();
            handle.session.lock().await
        }
    };
    let phase = session.request_stop()?;
    info!(session_id = %id, phase = %phase, "Stop requested");
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/feedback
/// Generates feedback once; later calls return the stored text.
pub async fn handle_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut session = handle.session.lock().await;
    session.begin_feedback()?;

    if session.feedback().is_none() {
        let result = generate_feedback(
            state.llm.as_ref(),
            &state.config.feedback_model,
            &state.feedback_template,
            session.transcript(),
        )
        .await;
        match result {
            Ok(text) => session.record_feedback(text),
            Err(e) => {
                let message = format!("Feedback generation failed: {e}");
                session.fail(message.clone());
                return Err(AppError::Llm(message));
            }
        }
    }

    Ok(Json(session.snapshot()))
}

/// GET /api/v1/sessions/:id/transcript
/// Plain-text download, available once the interview has ended.
pub async fn handle_download_transcript(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let handle = session_handle(&state, id).await?;
    let session = handle.session.lock().await;
    if !session.phase().is_closed() {
        return Err(AppError::Conflict(format!(
            "transcript is available once the interview has ended (currently {})",
            session.phase()
        )));
    }

    let disposition = format!("attachment; filename=\"{TRANSCRIPT_FILENAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        session.transcript().render_plain(),
    ))
}
