//! Blocking handoff primitives.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SingleEntrySyncChannel`] | Depth-1 blocking slot between a producer and a consumer |
//! | [`CommandRendezvous`] | Driver/runner alternation over two channels |
//! | [`Deadline`] | Wait budget shared by the steps of one operation |
//! | [`CancelToken`] | Abandons a wait whose caller went away |
//!
//! ```text
//!  Driver (submit)                                    Runner (poll)
//!  ───────────────                                    ─────────────
//!       │  put(command) ──► [ request slot ] ──► get()      │
//!       │                                                   │ execute in page
//!       │  get()  ◄──────── [ response slot ] ◄── put(result)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::Error;

// ============================================================================
// Submodules
// ============================================================================

/// Single-slot blocking channel.
pub mod channel;

/// Driver/runner command rendezvous.
pub mod rendezvous;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::SingleEntrySyncChannel;
pub use rendezvous::{CommandRendezvous, RendezvousStats};

// ============================================================================
// CancelToken
// ============================================================================

/// Shared flag that abandons a blocking wait.
///
/// Setting the flag does not wake anyone by itself; follow it with
/// [`SingleEntrySyncChannel::interrupt`] or
/// [`CommandRendezvous::interrupt`] so sleeping waiters re-check it.
/// A cancelled waiter leaves the channel exactly as it found it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates an unset token.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag. Idempotent.
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

// ============================================================================
// Deadline
// ============================================================================

/// Point in time after which a blocking wait gives up.
///
/// One deadline is created per operation and threaded through every
/// suspension point of that operation. It may carry a [`CancelToken`]
/// that ends the wait early.
#[derive(Debug, Clone)]
pub struct Deadline {
    /// `None` waits forever.
    at: Option<Instant>,
    /// Original budget, reported in timeout errors.
    budget: Duration,
    /// Abandons the wait when set.
    cancel: Option<CancelToken>,
}

impl Deadline {
    /// A deadline that never expires.
    #[inline]
    #[must_use]
    pub const fn never() -> Self {
        Self {
            at: None,
            budget: Duration::MAX,
            cancel: None,
        }
    }

    /// A deadline `budget` from now.
    ///
    /// Budgets too large to represent as an [`Instant`] never expire.
    #[inline]
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(budget),
            budget,
            cancel: None,
        }
    }

    /// Builds a deadline from an optional budget (`None` = forever).
    #[inline]
    #[must_use]
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::never, Self::after)
    }

    /// Attaches a cancel token.
    #[inline]
    #[must_use]
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the expiry instant, if bounded.
    #[inline]
    #[must_use]
    pub const fn at(&self) -> Option<Instant> {
        self.at
    }

    /// Returns `true` once the deadline has passed.
    #[inline]
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    /// Returns `true` if the attached token has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Time left before expiry (`None` when unbounded).
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Timeout error for `operation` under this deadline's budget.
    pub(crate) fn timeout_error(&self, operation: impl Into<String>) -> Error {
        let timeout_ms = u64::try_from(self.budget.as_millis()).unwrap_or(u64::MAX);
        Error::timeout(operation, timeout_ms)
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::never()
    }
}

// ============================================================================
// Tests
// ============================================================================
