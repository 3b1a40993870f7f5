//! Runner poll kinds.
//!
//! A runner poll always fetches the next command. What it publishes first
//! depends on why the runner is polling, and the runner says so explicitly
//! instead of leaving the bridge to infer it from a missing result.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// RunnerPoll
// ============================================================================

/// Why the in-browser runner is polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerPoll {
    /// First poll of a session, or a runner that reloaded and lost its state.
    Start,
    /// Publishes the result of the previously fetched command.
    Result(String),
    /// Polls again after a `retryLast`; nothing to publish.
    Retry,
}

impl RunnerPoll {
    /// Returns the poll kind name used in logs.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Result(_) => "result",
            Self::Retry => "retry",
        }
    }
}

impl From<Option<String>> for RunnerPoll {
    /// Maps the bare "prior result or nothing" form onto a poll kind.
    ///
    /// `None` is read as [`RunnerPoll::Start`].
    fn from(prior: Option<String>) -> Self {
        match prior {
            Some(result) => Self::Result(result),
            None => Self::Start,
        }
    }
}

impl fmt::Display for RunnerPoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

// ============================================================================
// Tests
// ============================================================================
