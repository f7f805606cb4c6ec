use serde::Serialize;

/// Interview lifecycle. Transitions only move forward:
///
/// ```text
/// Setup → Interviewing → Stopped ──┐
///              │                   ├→ Feedback
///              └───→ Completed ────┘
/// Interviewing | Feedback → Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Interviewing,
    Stopped,
    Completed,
    Feedback,
    /// A provider call failed. Terminal.
    Failed,
}

impl Phase {
    pub fn can_transition_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Setup, Interviewing)
                | (Interviewing, Stopped)
                | (Interviewing, Completed)
                | (Stopped, Feedback)
                | (Completed, Feedback)
                | (Interviewing, Failed)
                | (Feedback, Failed)
        )
    }

    /// The interview is over; no further candidate messages are accepted.
    pub fn is_closed(self) -> bool {
        !matches!(self, Phase::Setup | Phase::Interviewing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Interviewing => "interviewing",
            Phase::Stopped => "stopped",
            Phase::Completed => "completed",
            Phase::Feedback => "feedback",
            Phase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
