//! Live sessions by id, with idle expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use poegen_utils::error::PoeError;
use poegen_utils::types::SessionInputs;

use crate::session::Session;

/// Sessions idle this long are removed by [`SessionRegistry::expire_idle`].
pub const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Arc<Session>>>,
    idle_ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TTL)
    }
}

impl SessionRegistry {
    #[must_use]
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<Session>>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn create(&self, inputs: SessionInputs) -> Arc<Session> {
        let session = Arc::new(Session::with_inputs(inputs));
        self.lock().insert(session.id(), Arc::clone(&session));
        tracing::debug!(session = %session.id(), "Session created");
        session
    }

    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown or expired id.
    pub fn get(&self, id: Uuid) -> Result<Arc<Session>, PoeError> {
        self.lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| PoeError::SessionNotFound { id: id.to_string() })
    }

    /// Drop a session and everything it owns. Returns whether it existed.
    pub fn remove(&self, id: Uuid) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Remove sessions idle for longer than the TTL. Sessions with a
    /// generation in flight are kept. Returns the number removed.
    pub fn expire_idle(&self) -> usize {
        let ttl = self.idle_ttl;
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| session.in_flight().is_some() || session.idle_for() <= ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::info!(expired, remaining = sessions.len(), "Idle sessions expired");
        }
        expired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
