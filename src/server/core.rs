//! Standalone bridge server.
//!
//! The [`Bridge`] binds a listener, serves the routes from
//! [`router`](super::router) on a background task and owns the
//! [`SessionRegistry`] those routes use.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::session::SessionRegistry;

use super::builder::BridgeBuilder;
use super::options::BridgeOptions;
use super::routes;

// ============================================================================
// Bridge
// ============================================================================

/// Running HTTP bridge between test drivers and browser runners.
///
/// # Example
///
/// ```no_run
/// use selenese_bridge::Bridge;
///
/// # async fn example() -> selenese_bridge::Result<()> {
/// let bridge = Bridge::builder().port(4444).start().await?;
/// println!("listening on {}", bridge.base_url());
///
/// // ... run tests ...
///
/// bridge.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct Bridge {
    /// Address actually bound.
    addr: SocketAddr,
    /// Options the server was started with.
    options: BridgeOptions,
    /// Sessions served by this bridge.
    registry: Arc<SessionRegistry>,
    /// Graceful shutdown trigger.
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    /// Server task.
    server: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("addr", &self.addr)
            .field("session_count", &self.registry.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge - Public API
// ============================================================================

impl Bridge {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Binds and starts serving with validated options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if binding fails.
    pub async fn start(options: BridgeOptions, registry: Arc<SessionRegistry>) -> Result<Self> {
        let listener = TcpListener::bind(options.socket_addr()).await?;
        let addr = listener.local_addr()?;

        debug!(%addr, "Bridge listener bound");

        let app = routes::router(Arc::clone(&registry), options.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            let shutdown = async {
                let _ = shutdown_rx.await;
            };

            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!(error = %e, "Bridge server failed");
            }

            debug!("Bridge server task terminated");
        });

        info!(%addr, "Bridge started");

        Ok(Self {
            addr,
            options,
            registry,
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            server: Mutex::new(Some(server)),
        })
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Returns the URL prefix of all routes.
    ///
    /// Format: `http://{addr}/selenium-server`
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/selenium-server", self.addr)
    }

    /// Returns the options the bridge was started with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Returns the session registry served by this bridge.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Closes every session and stops the server.
    ///
    /// Blocked drivers and runners are answered with `410 Gone` before the
    /// listener stops. Calling this twice is harmless.
    pub async fn shutdown(&self) {
        info!(addr = %self.addr, "Bridge shutting down");

        self.registry.shutdown();

        if let Some(tx) = self.shutdown_tx.lock().take() {
            let _ = tx.send(());
        }

        let server = self.server.lock().take();
        if let Some(server) = server
            && let Err(e) = server.await
        {
            error!(error = %e, "Bridge server task panicked");
        }

        info!("Bridge shutdown complete");
    }
}

// ============================================================================
// Tests
// ============================================================================
