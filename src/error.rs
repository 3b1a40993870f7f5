//! Error types for the Selenese bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use selenese_bridge::{Command, Result};
//!
//! fn example(raw: &str) -> Result<()> {
//!     let command: Command = raw.parse()?;
//!     println!("verb = {}", command.verb());
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Wire format | [`Error::MalformedCommand`], [`Error::InvalidArgument`] |
//! | Rendezvous | [`Error::Timeout`], [`Error::Cancelled`], [`Error::ChannelClosed`], [`Error::Protocol`] |
//! | Sessions | [`Error::SessionNotFound`] |
//! | External | [`Error::Io`], [`Error::Task`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::task::JoinError;

use crate::identifiers::SessionId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// MalformedReason
// ============================================================================

/// Which structural check a raw command string failed.
///
/// Checks run in declaration order; the first failure wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// No command string was supplied at all.
    Missing,
    /// The command string is empty or whitespace only.
    Blank,
    /// The command string does not start with `|`.
    MissingLeadingDelimiter,
    /// The command string does not contain exactly four `|` characters.
    WrongDelimiterCount {
        /// Number of delimiters actually found.
        found: usize,
    },
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("command string is missing"),
            Self::Blank => f.write_str("command string is blank"),
            Self::MissingLeadingDelimiter => f.write_str("command string must start with '|'"),
            Self::WrongDelimiterCount { found } => {
                write!(f, "expected 4 '|' delimiters, found {found}")
            }
        }
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when bridge configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Wire Format Errors
    // ========================================================================
    /// A raw Selenese command string failed validation.
    ///
    /// The command never reaches the request channel.
    #[error("Malformed command {raw:?}: {reason}")]
    MalformedCommand {
        /// The offending raw string (empty when absent).
        raw: String,
        /// Which check failed.
        reason: MalformedReason,
    },

    /// Invalid argument in a request.
    ///
    /// Returned when HTTP request parameters are missing or contradictory.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // Rendezvous Errors
    // ========================================================================
    /// Operation timeout.
    ///
    /// Returned when a blocking handoff exceeds its wait budget.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The waiting caller went away.
    ///
    /// Returned when a wait's [`CancelToken`](crate::sync::CancelToken) is
    /// set, e.g. because the HTTP client disconnected.
    #[error("Cancelled: {operation}")]
    Cancelled {
        /// Description of the abandoned operation.
        operation: String,
    },

    /// The channel was closed while (or before) waiting on it.
    ///
    /// Returned when the owning session is torn down.
    #[error("Channel closed")]
    ChannelClosed,

    /// Driver/runner alternation was violated.
    ///
    /// Returned when a runner posts a result nobody asked for, or re-polls
    /// while a result is still owed.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Session not found in the registry.
    #[error("Session not found: {session_id}")]
    SessionNotFound {
        /// The missing session ID.
        session_id: SessionId,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Blocking task failed to complete.
    #[error("Task failed: {0}")]
    Task(#[from] JoinError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a malformed command error.
    #[inline]
    pub fn malformed(raw: impl Into<String>, reason: MalformedReason) -> Self {
        Self::MalformedCommand {
            raw: raw.into(),
            reason,
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates a cancellation error.
    #[inline]
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a session not found error.
    #[inline]
    pub fn session_not_found(session_id: SessionId) -> Self {
        Self::SessionNotFound { session_id }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if the session's channels were closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed)
    }

    /// Returns `true` if the wait was abandoned by its caller.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns `true` if a command string failed validation.
    #[inline]
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedCommand { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
