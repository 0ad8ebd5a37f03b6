//! Query server listener management.
//!
//! [`QueryServer::bind`] claims the TCP address eagerly so bind failures
//! surface during initialization; [`QueryServer::run`] then serves until
//! the supplied shutdown future resolves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the query server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// A bound, not yet running, HTTP server.
#[derive(Debug)]
pub struct QueryServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
}

impl QueryServer {
    /// Bind `address` and build the router over `state`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be resolved or
    /// bound.
    pub async fn bind(address: &str, state: Arc<AppState>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| ServerError::Bind(format!("bind failed on {address}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(format!("no local address for {address}: {e}")))?;

        Ok(Self {
            listener,
            local_addr,
            router: build_router(state),
        })
    }

    /// The address actually bound (resolves port `0`).
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests until `shutdown` resolves, then stop accepting and
    /// drain open connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Serve`] on a fatal I/O error.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr;
        info!(%addr, "query server listening");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

        info!(%addr, "query server stopped");
        Ok(())
    }
}
