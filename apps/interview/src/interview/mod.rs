// Interview simulator core: profile → streamed chat turns → stop/complete
// → optional feedback. All provider calls go through llm_client.

use thiserror::Error;

pub mod feedback;
pub mod handlers;
pub mod phase;
pub mod profile;
pub mod session;
pub mod stop;
pub mod store;
pub mod transcript;
pub mod turn;

use phase::Phase;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} while the interview is {phase}")]
    InvalidPhase { action: &'static str, phase: Phase },

    #[error("{0}")]
    Validation(String),

    #[error("the interview is limited to {0} candidate messages")]
    LimitReached(usize),

    #[error("the interview was stopped")]
    StopRequested,

    #[error("interview was stopped before it began; no feedback available")]
    FeedbackUnavailable,
}
