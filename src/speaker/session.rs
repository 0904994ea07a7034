//! Response session tracking
//!
//! Each response gets a monotonically increasing id. Only the newest session
//! is live; older sessions notice they were superseded at their next poll.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of one response session (never 0)
pub type SessionId = u64;

/// Marker for "no session is responding"
const NO_SESSION: SessionId = 0;

/// Hands out session ids and tracks the live one
#[derive(Debug, Default)]
pub struct SessionManager {
    last_issued: AtomicU64,
    live: AtomicU64,
}

impl SessionManager {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Start a new session, superseding any session still in flight
    #[must_use]
    pub fn begin(self: &Arc<Self>) -> SessionGuard {
        let id = self.last_issued.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.live.swap(id, Ordering::SeqCst);

        if previous == NO_SESSION {
            tracing::trace!(session = id, "session started");
        } else {
            tracing::debug!(session = id, superseded = previous, "session started");
        }

        SessionGuard {
            id,
            manager: Arc::clone(self),
        }
    }

    /// Whether `id` is still the newest session
    #[must_use]
    pub fn is_live(&self, id: SessionId) -> bool {
        self.live.load(Ordering::SeqCst) == id
    }

    /// Whether any session is currently responding
    #[must_use]
    pub fn is_responding(&self) -> bool {
        self.live.load(Ordering::SeqCst) != NO_SESSION
    }

    /// Id of the live session, if any
    #[must_use]
    pub fn current(&self) -> Option<SessionId> {
        match self.live.load(Ordering::SeqCst) {
            NO_SESSION => None,
            id => Some(id),
        }
    }

    /// Release `id`; a newer session keeps its live status
    fn end(&self, id: SessionId) {
        let released = self
            .live
            .compare_exchange(id, NO_SESSION, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        tracing::trace!(session = id, released, "session ended");
    }
}

/// Live session handle; dropping it ends the session
#[derive(Debug)]
pub struct SessionGuard {
    id: SessionId,
    manager: Arc<SessionManager>,
}

impl SessionGuard {
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Whether no newer session has started since this one
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.manager.is_live(self.id)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.manager.end(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase() {
        let sessions = SessionManager::new();
        let first = sessions.begin();
        let second = sessions.begin();

        assert!(second.id() > first.id());
    }

    #[test]
    fn newer_session_supersedes_older() {
        let sessions = SessionManager::new();
        let old = sessions.begin();
        assert!(old.is_live());

        let new = sessions.begin();
        assert!(!old.is_live());
        assert!(new.is_live());
        assert_eq!(sessions.current(), Some(new.id()));
    }

    #[test]
    fn drop_releases_session() {
        let sessions = SessionManager::new();
        {
            let _session = sessions.begin();
            assert!(sessions.is_responding());
        }
        assert!(!sessions.is_responding());
        assert_eq!(sessions.current(), None);
    }

    #[test]
    fn ending_old_session_keeps_newer_live() {
        let sessions = SessionManager::new();
        let old = sessions.begin();
        let new = sessions.begin();

        drop(old);
        assert!(new.is_live());
        assert!(sessions.is_responding());
    }
}
