//! Builder pattern for bridge configuration.
//!
//! Provides a fluent API for configuring and starting a [`Bridge`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use selenese_bridge::Bridge;
//!
//! # async fn example() -> selenese_bridge::Result<()> {
//! let bridge = Bridge::builder()
//!     .port(4444)
//!     .runner_timeout(Duration::from_secs(10))
//!     .start()
//!     .await?;
//!
//! println!("driver endpoint: {}/driver", bridge.base_url());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::session::SessionRegistry;

use super::core::Bridge;
use super::options::BridgeOptions;

// ============================================================================
// BridgeBuilder
// ============================================================================

/// Builder for configuring a [`Bridge`] instance.
///
/// Use [`Bridge::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct BridgeBuilder {
    /// Accumulated options.
    options: BridgeOptions,
    /// Registry to serve instead of a fresh one.
    registry: Option<Arc<SessionRegistry>>,
}

// ============================================================================
// BridgeBuilder Implementation
// ============================================================================

impl BridgeBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the IP address to bind.
    #[inline]
    #[must_use]
    pub fn ip(mut self, ip: IpAddr) -> Self {
        self.options = self.options.with_bind_ip(ip);
        self
    }

    /// Sets the port to bind (0 for random).
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options = self.options.with_port(port);
        self
    }

    /// Sets the overall budget of one driver command.
    #[inline]
    #[must_use]
    pub fn driver_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_driver_timeout(timeout);
        self
    }

    /// Lets driver commands wait forever.
    #[inline]
    #[must_use]
    pub fn no_driver_timeout(mut self) -> Self {
        self.options = self.options.without_driver_timeout();
        self
    }

    /// Sets how long a runner poll waits before answering `retryLast`.
    #[inline]
    #[must_use]
    pub fn runner_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_runner_timeout(timeout);
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: BridgeOptions) -> Self {
        self.options = options;
        self
    }

    /// Serves an existing registry (e.g. one shared with other code).
    #[inline]
    #[must_use]
    pub fn registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validates the configuration without starting anything.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) for invalid timeouts.
    pub fn build(self) -> Result<(BridgeOptions, Arc<SessionRegistry>)> {
        self.options.validate()?;
        let registry = self.registry.unwrap_or_default();
        Ok((self.options, registry))
    }

    /// Validates the configuration, binds and starts serving.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`](crate::Error::Config) for invalid timeouts
    /// - [`Error::Io`](crate::Error::Io) if binding fails
    pub async fn start(self) -> Result<Bridge> {
        let (options, registry) = self.build()?;
        Bridge::start(options, registry).await
    }
}

// ============================================================================
// Tests
// ============================================================================
