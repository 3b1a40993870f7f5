//! Selenese wire types.
//!
//! This module defines what crosses the HTTP boundary between the bridge,
//! the test driver and the in-browser runner.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`Command`] | Driver → Runner | Next action, encoded as `\|verb\|arg1\|arg2\|` |
//! | result string | Runner → Driver | Outcome of the previous command |
//! | [`RunnerPoll`] | Runner → Bridge | Why the runner is asking for work |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command type and pipe-delimited codec |
//! | `poll` | Runner poll kinds |

// ============================================================================
// Submodules
// ============================================================================

/// Command type and pipe-delimited codec.
pub mod command;

/// Runner poll kinds.
pub mod poll;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, RETRY_LAST, TEST_COMPLETE};
pub use poll::RunnerPoll;
