//! Bridge server options.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use selenese_bridge::BridgeOptions;
//!
//! let options = BridgeOptions::new()
//!     .with_port(4444)
//!     .with_driver_timeout(Duration::from_secs(90))
//!     .with_runner_timeout(Duration::from_secs(10));
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default bind address (localhost).
pub const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default budget for a driver request, queueing included.
pub const DEFAULT_DRIVER_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time a runner poll waits for a command before `retryLast`.
pub const DEFAULT_RUNNER_TIMEOUT: Duration = Duration::from_secs(20);

// ============================================================================
// BridgeOptions
// ============================================================================

/// Network and timeout settings for a [`Bridge`](super::Bridge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeOptions {
    /// IP address to bind.
    pub bind_ip: IpAddr,

    /// Port to bind (0 = OS-assigned).
    pub port: u16,

    /// Budget for one driver command; `None` waits forever.
    pub driver_timeout: Option<Duration>,

    /// How long a runner poll waits for a command.
    pub runner_timeout: Duration,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bind_ip: DEFAULT_BIND_IP,
            port: 0,
            driver_timeout: Some(DEFAULT_DRIVER_TIMEOUT),
            runner_timeout: DEFAULT_RUNNER_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeOptions {
    /// Sets the bind IP address.
    #[inline]
    #[must_use]
    pub fn with_bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    /// Sets the bind port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the driver command budget.
    #[inline]
    #[must_use]
    pub fn with_driver_timeout(mut self, timeout: Duration) -> Self {
        self.driver_timeout = Some(timeout);
        self
    }

    /// Lets driver commands wait forever.
    #[inline]
    #[must_use]
    pub fn without_driver_timeout(mut self) -> Self {
        self.driver_timeout = None;
        self
    }

    /// Sets the runner poll wait.
    #[inline]
    #[must_use]
    pub fn with_runner_timeout(mut self, timeout: Duration) -> Self {
        self.runner_timeout = timeout;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeOptions {
    /// Returns the socket address to bind.
    #[inline]
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Checks that every timeout is non-zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first bad setting.
    pub fn validate(&self) -> Result<()> {
        if self.driver_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config(
                "driver timeout must be greater than zero. \
                 Use without_driver_timeout() to wait forever.",
            ));
        }

        if self.runner_timeout.is_zero() {
            return Err(Error::config("runner timeout must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = BridgeOptions::default();
        assert_eq!(options.bind_ip, DEFAULT_BIND_IP);
        assert_eq!(options.port, 0);
        assert_eq!(options.driver_timeout, Some(DEFAULT_DRIVER_TIMEOUT));
        assert_eq!(options.runner_timeout, DEFAULT_RUNNER_TIMEOUT);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = BridgeOptions::new()
            .with_bind_ip(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .with_port(4444)
            .without_driver_timeout()
            .with_runner_timeout(Duration::from_secs(5));

        assert_eq!(options.socket_addr().port(), 4444);
        assert!(options.driver_timeout.is_none());
        assert_eq!(options.runner_timeout.as_secs(), 5);
    }

    #[test]
    fn test_zero_driver_timeout_rejected() {
        let err = BridgeOptions::new()
            .with_driver_timeout(Duration::ZERO)
            .validate()
            .expect_err("zero timeout");
        assert!(err.to_string().contains("driver timeout"));
    }

    #[test]
    fn test_zero_runner_timeout_rejected() {
        let err = BridgeOptions::new()
            .with_runner_timeout(Duration::ZERO)
            .validate()
            .expect_err("zero timeout");
        assert!(err.to_string().contains("runner timeout"));
    }
}
