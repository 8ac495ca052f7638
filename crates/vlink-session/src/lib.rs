//! Session holder (C5): current session, atomic replace and invalidate,
//! consistent reads.

use std::sync::Arc;

use tokio::sync::RwLock;

use vlink_types::{now_epoch_secs, Session};

/// Holds the current session, if any. Cloned cheaply (an `Arc` around
/// the lock) so `vlink-codec`/`vlink-transport`/`vlink-push` callers can
/// each keep their own handle to the same underlying state, matching the
/// "instance-scoped, not a process global" design note.
#[derive(Clone, Default)]
pub struct SessionHolder {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionHolder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a cloned snapshot of the current session, or `None` — the
    /// "absent" sentinel.
    pub async fn current(&self) -> Option<Session> {
        self.inner.read().await.clone()
    }

    /// Replaces the held session atomically, discarding whatever was
    /// there before (a re-auth produces a wholly new session, it never
    /// mutates the old one in place).
    pub async fn replace(&self, session: Session) {
        *self.inner.write().await = Some(session);
    }

    /// Clears the held session, e.g. on a detected `SessionExpired` code.
    pub async fn invalidate(&self) {
        *self.inner.write().await = None;
    }

    /// True if no session is held, or the held session's TTL has elapsed.
    pub async fn is_expired(&self) -> bool {
        match self.inner.read().await.as_ref() {
            Some(session) => session.is_expired(now_epoch_secs()),
            None => true,
        }
    }

    /// Non-blocking best-effort snapshot of the held session's content
    /// key, for callers that cannot await — the push listener's
    /// synchronous dispatch callback, in particular. Returns `None` if
    /// no session is held or the lock is momentarily held by a writer;
    /// the caller treats both the same as "no session" and drops the
    /// message rather than blocking the event loop.
    pub fn try_content_key(&self) -> Option<Vec<u8>> {
        self.inner.try_read().ok()?.as_ref().map(Session::content_key_bytes)
    }
}
