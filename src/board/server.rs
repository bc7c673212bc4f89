//! Listening socket and accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::net::TcpListener;

use super::registry::Registry;
use super::session::Session;
use crate::config::Config;

/// The whiteboard server: one TCP listener plus the shared registry.
///
/// `bind` and `run` are split so callers (the integration tests in
/// particular) can learn the actual listen address before the accept loop
/// starts, which makes binding to port 0 useful.
pub struct WhiteboardServer {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl WhiteboardServer {
    /// Bind the listening socket and build the process-wide registry.
    pub async fn bind(config: &Config) -> Result<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!(
            "listening on {} (canvas {}x{})",
            listener.local_addr()?,
            config.canvas.width,
            config.canvas.height
        );
        Ok(WhiteboardServer {
            listener,
            registry: Arc::new(Registry::new(config.canvas.width, config.canvas.height)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections forever, one session task each.
    ///
    /// Only a failure of the listening socket itself ends this loop; that is
    /// an unrecoverable fault and propagates to the caller. Per-connection
    /// trouble is contained inside the session task.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .context("accept failed on listening socket")?;
            if let Err(e) = stream.set_nodelay(true) {
                warn!("{}: could not set TCP_NODELAY: {}", peer, e);
            }
            let registry = Arc::clone(&self.registry);
            tokio::spawn(Session::run(stream, peer, registry));
        }
    }
}
