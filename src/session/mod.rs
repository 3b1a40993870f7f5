//! Session bookkeeping.
//!
//! One [`CommandRendezvous`](crate::sync::CommandRendezvous) per browser
//! session, owned by an explicit [`SessionRegistry`].

// ============================================================================
// Submodules
// ============================================================================

/// Session key to rendezvous map.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use registry::SessionRegistry;
