use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::interview::session::Session;
use crate::interview::stop::StopSignal;

/// A live session. The stop latch sits outside the mutex so a stop request
/// can reach a turn that is holding the session.
#[derive(Clone)]
pub struct SessionHandle {
    pub stop: StopSignal,
    pub session: Arc<Mutex<Session>>,
}

struct Slot {
    handle: SessionHandle,
    last_active: Instant,
}

/// Per-tab sessions keyed by id. Sessions idle for longer than `ttl` are
/// pruned because the server never sees a tab close. Every lookup counts
/// as activity.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Slot>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn create(&self) -> SessionHandle {
        let id = Uuid::new_v4();
        let stop = StopSignal::new();
        let handle = SessionHandle {
            stop: stop.clone(),
            session: Arc::new(Mutex::new(Session::new(id, stop))),
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| slot.last_active.elapsed() < self.ttl);
        if sessions.len() < before {
            debug!("Pruned {} idle sessions", before - sessions.len());
        }
        sessions.insert(
            id,
            Slot {
                handle: handle.clone(),
                last_active: Instant::now(),
            },
        );
        info!(session_id = %id, active = sessions.len(), "Session created");
        handle
    }

    /// Looks up a live session and marks it active.
    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let slot = sessions.get_mut(&id)?;
        if slot.last_active.elapsed() >= self.ttl {
            return None;
        }
        slot.last_active = Instant::now();
        Some(slot.handle.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session discarded");
        }
        removed
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
