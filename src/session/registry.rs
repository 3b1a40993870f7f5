//! Session registry.
//!
//! Maps session keys to their [`CommandRendezvous`]. The registry is an
//! ordinary value handed to whoever needs it (usually behind an `Arc`);
//! there is no process-wide instance.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           SessionRegistry               │
//! │  ┌─────────────────────────────────┐   │
//! │  │ "a1f3…" → CommandRendezvous     │   │
//! │  │ "9c07…" → CommandRendezvous     │   │
//! │  │ "suite" → CommandRendezvous     │   │
//! │  └─────────────────────────────────┘   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The map lock is only held for lookups and inserts, never while a driver
//! or runner is blocked inside a rendezvous.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::sync::{CommandRendezvous, RendezvousStats};

// ============================================================================
// SessionRegistry
// ============================================================================

/// Owns one [`CommandRendezvous`] per session.
///
/// Thread-safe; guarantees at most one rendezvous per key.
///
/// # Example
///
/// ```
/// use selenese_bridge::{SessionId, SessionRegistry};
///
/// let registry = SessionRegistry::new();
/// let id = SessionId::new("suite-1");
///
/// let first = registry.get_or_create(&id);
/// let second = registry.get_or_create(&id);
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
///
/// assert!(registry.remove(&id));
/// assert!(first.is_closed());
/// ```
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Active sessions.
    sessions: RwLock<FxHashMap<SessionId, Arc<CommandRendezvous>>>,
    /// Set by [`shutdown`](Self::shutdown); no sessions are created after.
    closed: AtomicBool,
}

// ============================================================================
// SessionRegistry - Public API
// ============================================================================

impl SessionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session's rendezvous, creating it on first reference.
    ///
    /// After [`shutdown`](Self::shutdown) this hands out a detached,
    /// already-closed rendezvous so late callers fail fast.
    pub fn get_or_create(&self, session_id: &SessionId) -> Arc<CommandRendezvous> {
        if let Some(rendezvous) = self.sessions.read().get(session_id) {
            return Arc::clone(rendezvous);
        }

        let mut sessions = self.sessions.write();
        if self.closed.load(Ordering::Acquire) {
            let rendezvous = CommandRendezvous::new();
            rendezvous.close();
            return Arc::new(rendezvous);
        }

        let rendezvous = sessions.entry(session_id.clone()).or_insert_with(|| {
            debug!(session_id = %session_id, "Session created");
            Arc::new(CommandRendezvous::new())
        });

        Arc::clone(rendezvous)
    }

    /// Returns the session's rendezvous if it exists.
    #[must_use]
    pub fn get(&self, session_id: &SessionId) -> Option<Arc<CommandRendezvous>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Returns the session's rendezvous.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if the session does not exist.
    pub fn require(&self, session_id: &SessionId) -> Result<Arc<CommandRendezvous>> {
        self.get(session_id)
            .ok_or_else(|| Error::session_not_found(session_id.clone()))
    }

    /// Creates a session under a freshly generated ID.
    pub fn create(&self) -> SessionId {
        let session_id = SessionId::generate();
        self.get_or_create(&session_id);
        session_id
    }

    /// Removes a session and closes its rendezvous.
    ///
    /// Blocked drivers and runners of that session wake with
    /// [`Error::ChannelClosed`]. Returns `false` if no such session existed.
    pub fn remove(&self, session_id: &SessionId) -> bool {
        let removed = self.sessions.write().remove(session_id);

        match removed {
            Some(rendezvous) => {
                rendezvous.close();
                debug!(session_id = %session_id, "Session removed");
                true
            }
            None => false,
        }
    }

    /// Returns the number of sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns `true` if there are no sessions.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Returns all session IDs, sorted.
    #[must_use]
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns per-session stats, sorted by session ID.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(SessionId, RendezvousStats)> {
        let mut entries: Vec<_> = self
            .sessions
            .read()
            .iter()
            .map(|(id, rendezvous)| (id.clone(), rendezvous.stats()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Closes and drops every session.
    pub fn shutdown(&self) {
        let sessions: Vec<_> = {
            let mut map = self.sessions.write();
            self.closed.store(true, Ordering::Release);
            map.drain().collect()
        };

        let count = sessions.len();
        for (session_id, rendezvous) in sessions {
            rendezvous.close();
            debug!(session_id = %session_id, "Session closed during shutdown");
        }

        info!(count, "SessionRegistry shut down");
    }
}

// ============================================================================
// Tests
// ============================================================================
