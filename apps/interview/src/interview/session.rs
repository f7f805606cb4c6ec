//! Interview state machine for a single browser session.
//!
//! Every mutation goes through a method that checks the current phase, so
//! the invariants hold regardless of which handler drives the session:
//! - at most `MAX_CANDIDATE_MESSAGES` candidate entries in the transcript
//! - once the stop latch is raised no new candidate message is accepted
//! - feedback is reachable only with at least one candidate message

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::interview::phase::Phase;
use crate::interview::profile::CandidateProfile;
use crate::interview::stop::StopSignal;
use crate::interview::transcript::{Entry, Role, Transcript};
use crate::interview::SessionError;

pub const MAX_CANDIDATE_MESSAGES: usize = 5;
pub const MESSAGE_MAX_CHARS: usize = 1000;

const STOPPED_BEFORE_START_NOTICE: &str = "Interview was stopped before it began.";
const STOPPED_NOTICE: &str = "Interview stopped by user.";
const COMPLETED_NOTICE: &str = "Interview complete.";

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    phase: Phase,
    profile: Option<CandidateProfile>,
    transcript: Transcript,
    stop: StopSignal,
    feedback: Option<String>,
    error: Option<String>,
}

/// Read-only view returned to the page after every action.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub phase: Phase,
    pub profile: Option<CandidateProfile>,
    pub messages: Vec<Entry>,
    pub candidate_messages: usize,
    pub max_candidate_messages: usize,
    pub stop_requested: bool,
    pub feedback_available: bool,
    pub feedback: Option<String>,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl Session {
    pub fn new(id: Uuid, stop: StopSignal) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            phase: Phase::Setup,
            profile: None,
            transcript: Transcript::new(),
            stop,
            feedback: None,
            error: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    pub fn candidate_count(&self) -> usize {
        self.transcript.candidate_count()
    }

    /// Setup → Interviewing. Seeds the transcript with the persona prompt.
    pub fn begin(&mut self, profile: CandidateProfile) -> Result<(), SessionError> {
        self.expect_phase(Phase::Setup, "start the interview")?;
        let profile = profile.normalized()?;
        self.transcript.push(Role::System, profile.interviewer_prompt());
        info!(
            session_id = %self.id,
            position = %profile.position,
            company = %profile.company,
            "Interview started"
        );
        self.profile = Some(profile);
        self.enter(Phase::Interviewing);
        Ok(())
    }

    /// Appends a candidate message ahead of a model turn.
    pub fn submit_candidate_message(&mut self, text: &str) -> Result<(), SessionError> {
        self.expect_phase(Phase::Interviewing, "send a message")?;
        if self.stop.is_raised() {
            // Latch raised while no turn held the session.
            self.enter(Phase::Stopped);
            return Err(SessionError::StopRequested);
        }
        if self.candidate_count() >= MAX_CANDIDATE_MESSAGES {
            return Err(SessionError::LimitReached(MAX_CANDIDATE_MESSAGES));
        }

        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::Validation(
                "message must not be empty".to_string(),
            ));
        }
        if text.chars().count() > MESSAGE_MAX_CHARS {
            return Err(SessionError::Validation(format!(
                "message must be at most {MESSAGE_MAX_CHARS} characters"
            )));
        }

        self.transcript.push(Role::Candidate, text);
        Ok(())
    }

    /// Keeps whatever the interviewer produced, including partial output
    /// cut short by a stop.
    pub fn record_interviewer_reply(&mut self, text: String) {
        if !text.is_empty() {
            self.transcript.push(Role::Interviewer, text);
        }
    }

    /// Settles the phase after a turn: Stopped if the latch was raised,
    /// Completed once the message limit is reached.
    pub fn finish_turn(&mut self) -> Phase {
        if self.phase != Phase::Interviewing {
            return self.phase;
        }
        if self.stop.is_raised() {
            self.enter(Phase::Stopped);
        } else if self.candidate_count() >= MAX_CANDIDATE_MESSAGES {
            self.enter(Phase::Completed);
        }
        self.phase
    }

    /// Raises the stop latch. Ends the interview if it is running; a no-op
    /// once it has already ended.
    pub fn request_stop(&mut self) -> Result<Phase, SessionError> {
        if self.phase == Phase::Setup {
            return Err(SessionError::InvalidPhase {
                action: "stop the interview",
                phase: self.phase,
            });
        }
        self.stop.raise();
        if self.phase == Phase::Interviewing {
            if self.candidate_count() == 0 {
                warn!(session_id = %self.id, "Interview stopped before the first answer");
            }
            self.enter(Phase::Stopped);
        }
        Ok(self.phase)
    }

    /// Records a provider failure. Terminal.
    pub fn fail(&mut self, message: String) {
        warn!(session_id = %self.id, phase = %self.phase, "Session failed: {message}");
        if self.phase.can_transition_to(Phase::Failed) {
            self.enter(Phase::Failed);
        }
        self.error = Some(message);
    }

    pub fn feedback_available(&self) -> bool {
        matches!(self.phase, Phase::Stopped | Phase::Completed) && self.candidate_count() > 0
    }

    /// Stopped/Completed → Feedback. Already in Feedback is accepted so a
    /// repeated request can return the stored result.
    pub fn begin_feedback(&mut self) -> Result<(), SessionError> {
        if self.phase == Phase::Feedback {
            return Ok(());
        }
        if !self.feedback_available() {
            return Err(match self.phase {
                Phase::Stopped | Phase::Completed => SessionError::FeedbackUnavailable,
                phase => SessionError::InvalidPhase {
                    action: "request feedback",
                    phase,
                },
            });
        }
        self.enter(Phase::Feedback);
        Ok(())
    }

    pub fn record_feedback(&mut self, text: String) {
        self.feedback = Some(text);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            created_at: self.created_at,
            phase: self.phase,
            profile: self.profile.clone(),
            messages: self.transcript.dialogue().cloned().collect(),
            candidate_messages: self.candidate_count(),
            max_candidate_messages: MAX_CANDIDATE_MESSAGES,
            stop_requested: self.stop.is_raised(),
            feedback_available: self.feedback_available(),
            feedback: self.feedback.clone(),
            error: self.error.clone(),
            notice: self.notice().map(str::to_string),
        }
    }

    fn notice(&self) -> Option<&'static str> {
        match self.phase {
            Phase::Stopped if self.candidate_count() == 0 => Some(STOPPED_BEFORE_START_NOTICE),
            Phase::Stopped => Some(STOPPED_NOTICE),
            Phase::Completed => Some(COMPLETED_NOTICE),
            _ => None,
        }
    }

    fn expect_phase(&self, expected: Phase, action: &'static str) -> Result<(), SessionError> {
        if self.phase != expected {
            return Err(SessionError::InvalidPhase {
                action,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn enter(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        info!(session_id = %self.id, from = %self.phase, to = %next, "Phase transition");
        self.phase = next;
        self.stop.set_armed(next == Phase::Interviewing);
    }
}
