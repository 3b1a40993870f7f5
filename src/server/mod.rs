//! HTTP surface of the bridge.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Bridge`] | Running server with its session registry |
//! | [`BridgeBuilder`] | Fluent configuration builder |
//! | [`BridgeOptions`] | Bind address and timeouts |
//! | [`router`] | The routes, for embedding in another axum app |
//!
//! # Example
//!
//! ```no_run
//! use selenese_bridge::Bridge;
//!
//! # async fn example() -> selenese_bridge::Result<()> {
//! let bridge = Bridge::builder().port(4444).start().await?;
//!
//! // Driver:  GET {base}/driver?sessionId=s&commandRequest=|open|/||
//! // Runner:  GET {base}/runner?sessionId=s&seleniumStart=true
//! println!("{}", bridge.base_url());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for bridge configuration.
pub mod builder;

/// Standalone server lifecycle.
pub mod core;

/// Bind address and timeout options.
pub mod options;

/// Route table and handlers.
pub mod routes;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::BridgeBuilder;
pub use self::core::Bridge;
pub use options::BridgeOptions;
pub use routes::router;
