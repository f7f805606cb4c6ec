use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// Stop latch shared by the Stop button, the Escape shortcut and the
/// streaming loop. Once raised it stays raised for the session's lifetime.
///
/// The latch is armed only while the interview is running. Callers that
/// cannot see the session phase (it sits behind the session mutex) use
/// `raise_if_armed` so a stop during setup never sticks.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    armed: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.token.cancel();
    }

    pub fn is_raised(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn set_armed(&self, armed: bool) {
        self.armed.store(armed, Ordering::SeqCst);
    }

    /// Raises the latch if the interview is running. Returns whether it did.
    pub fn raise_if_armed(&self) -> bool {
        if self.armed.load(Ordering::SeqCst) {
            self.raise();
            true
        } else {
            false
        }
    }

    /// Resolves once the latch is raised.
    pub async fn raised(&self) {
        self.token.cancelled().await
    }

    #[cfg(test)]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}
