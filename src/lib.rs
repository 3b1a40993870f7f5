//! Selenese bridge - command rendezvous between a test driver and a browser.
//!
//! This library passes Selenese commands from an out-of-process test driver
//! to an in-page runner that can only reach the outside world by polling
//! over HTTP, and passes each result back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   GET /driver    ┌──────────────────────┐   GET/POST /runner  ┌──────────────┐
//! │ Test driver  │ ───────────────► │  SessionRegistry     │ ◄────────────────── │ Browser      │
//! │              │ ◄─────────────── │   └ CommandRendezvous│ ──────────────────► │ runner       │
//! └──────────────┘   result         └──────────────────────┘   |verb|arg1|arg2|  └──────────────┘
//! ```
//!
//! Key design principles:
//!
//! - One [`CommandRendezvous`] per session, owned by an explicit
//!   [`SessionRegistry`] (no global state)
//! - Each direction is a depth-1 [`SingleEntrySyncChannel`]; the depth
//!   is what enforces strict alternation
//! - Every blocking wait takes a timeout and fails with a typed error
//! - Closing a session wakes everyone blocked on it
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use selenese_bridge::{Command, CommandRendezvous, Result};
//!
//! fn main() -> Result<()> {
//!     let rendezvous = Arc::new(CommandRendezvous::new());
//!
//!     let driver = {
//!         let rendezvous = Arc::clone(&rendezvous);
//!         thread::spawn(move || rendezvous.submit(Command::new("open", "/", "")))
//!     };
//!
//!     // Runner side: first poll has no result to publish.
//!     let command = rendezvous.poll(None)?;
//!     assert_eq!(command.encode(), "|open|/||");
//!
//!     // Publish the result; the driver's submit returns it.
//!     let runner = {
//!         let rendezvous = Arc::clone(&rendezvous);
//!         thread::spawn(move || rendezvous.poll(Some("OK".to_string())))
//!     };
//!     assert_eq!(driver.join().unwrap()?, "OK");
//!
//!     rendezvous.close();
//!     assert!(runner.join().unwrap().is_err());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Selenese command codec and runner poll kinds |
//! | [`sync`] | Single-slot channel and command rendezvous |
//! | [`session`] | Session registry |
//! | [`server`] | HTTP bridge (axum) |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Selenese wire types.
pub mod protocol;

/// HTTP surface: server lifecycle, configuration and routes.
pub mod server;

/// Session registry.
pub mod session;

/// Blocking handoff primitives.
///
/// - [`SingleEntrySyncChannel`] - depth-1 blocking slot
/// - [`CommandRendezvous`] - driver/runner alternation
pub mod sync;

// ============================================================================
// Re-exports
// ============================================================================

// Error types
pub use error::{Error, MalformedReason, Result};

// Identifier types
pub use identifiers::SessionId;

// Protocol types
pub use protocol::{Command, RunnerPoll};

// Server types
pub use server::{Bridge, BridgeBuilder, BridgeOptions};

// Session types
pub use session::SessionRegistry;

// Sync types
pub use sync::{
    CancelToken, CommandRendezvous, Deadline, RendezvousStats, SingleEntrySyncChannel,
};
