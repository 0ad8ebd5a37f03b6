//! Lifecycle controller for the debug collector.
//!
//! [`DebuggerService`] is constructed by the host and driven through
//! `init -> serve -> stop`. It owns the ring buffer, hands clones of the
//! buffer handle to the HTTP state and the RPC ingest adapter, and
//! enforces the shutdown grace period.
//!
//! # Usage
//!
//! ```rust,ignore
//! let rpc = RpcRegistry::new();
//! let service = Arc::new(DebuggerService::new());
//! service.init(&config.debugger, &rpc).await?;
//!
//! let serving = tokio::spawn({
//!     let service = Arc::clone(&service);
//!     async move { service.serve().await }
//! });
//! // ... later
//! service.stop().await;
//! serving.await??;
//! ```

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use ringlog_core::{
    ConfigError, DebuggerConfig, EventBuffer, EventIngest, RpcRegistry, SERVICE_NAME,
};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::server::{QueryServer, ServerError};
use crate::state::AppState;

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Constructed, no resources allocated.
    Uninitialized,
    /// Buffer allocated, listener bound, RPC method registered.
    Initialized,
    /// HTTP server running.
    Serving,
    /// Shut down; ingest refuses calls and the buffer stays empty.
    Stopped,
}

/// Errors surfaced to the host by the lifecycle hooks.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP server failed to bind or failed while serving.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// A lifecycle hook was called in the wrong state.
    #[error("cannot {action} while {from:?}")]
    InvalidTransition {
        /// State the service was in.
        from: ServiceState,
        /// The hook that was called.
        action: &'static str,
    },
}

/// Internal lifecycle state, carrying the resources each phase owns.
#[derive(Debug)]
enum Phase {
    Uninitialized,
    Initialized(QueryServer),
    Serving {
        abort: AbortHandle,
        done: watch::Receiver<bool>,
    },
    Stopped,
}

impl Phase {
    const fn state(&self) -> ServiceState {
        match self {
            Self::Uninitialized => ServiceState::Uninitialized,
            Self::Initialized(_) => ServiceState::Initialized,
            Self::Serving { .. } => ServiceState::Serving,
            Self::Stopped => ServiceState::Stopped,
        }
    }
}

/// Resources fixed at initialization.
#[derive(Debug)]
struct Bound {
    buffer: EventBuffer,
    ingest: EventIngest,
    capacity: NonZeroUsize,
    grace: Duration,
    local_addr: SocketAddr,
}

/// The debug collector service.
#[derive(Debug)]
pub struct DebuggerService {
    phase: Mutex<Phase>,
    bound: OnceLock<Bound>,
    shutdown: watch::Sender<bool>,
}

impl Default for DebuggerService {
    fn default() -> Self {
        Self::new()
    }
}

impl DebuggerService {
    /// Create an uninitialized service.
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            phase: Mutex::new(Phase::Uninitialized),
            bound: OnceLock::new(),
            shutdown,
        }
    }

    /// Validate `config`, allocate the ring, bind the HTTP listener, and
    /// register `debugger.SendDebugInfo` with `rpc`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Config`] for a zero history size or malformed address
    /// - [`ServiceError::Server`] if the address cannot be bound
    /// - [`ServiceError::InvalidTransition`] unless the service is uninitialized
    pub async fn init(
        &self,
        config: &DebuggerConfig,
        rpc: &RpcRegistry,
    ) -> Result<(), ServiceError> {
        self.require_state(ServiceState::Uninitialized, "init")?;

        let capacity = config.capacity()?;
        let address = config.bind_address()?;
        let buffer = EventBuffer::new(capacity);
        let ingest = EventIngest::new(buffer.clone(), config.decode_policy);
        let state = Arc::new(AppState::new(buffer.clone()));
        let server = QueryServer::bind(&address, state).await?;
        let local_addr = server.local_addr();

        {
            let mut phase = self.lock_phase();
            if !matches!(*phase, Phase::Uninitialized) {
                return Err(ServiceError::InvalidTransition {
                    from: phase.state(),
                    action: "init",
                });
            }
            let bound = Bound {
                buffer,
                ingest: ingest.clone(),
                capacity,
                grace: config.shutdown_timeout(),
                local_addr,
            };
            if self.bound.set(bound).is_err() {
                return Err(ServiceError::InvalidTransition {
                    from: phase.state(),
                    action: "init",
                });
            }
            *phase = Phase::Initialized(server);
        }

        rpc.register(SERVICE_NAME, Arc::new(ingest));

        info!(
            history_size = capacity.get(),
            %local_addr,
            decode_policy = ?config.decode_policy,
            "debugger initialized"
        );
        Ok(())
    }

    /// Run the HTTP server until [`stop`](Self::stop) is called or a fatal
    /// error occurs.
    ///
    /// Returns `Ok(())` after a graceful stop, including one that had to be
    /// abandoned at the deadline.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidTransition`] unless the service is initialized
    /// - [`ServiceError::Server`] if the listener fails
    pub async fn serve(&self) -> Result<(), ServiceError> {
        let (task, local_addr) = {
            let mut phase = self.lock_phase();
            let server = match std::mem::replace(&mut *phase, Phase::Stopped) {
                Phase::Initialized(server) => server,
                other => {
                    let from = other.state();
                    *phase = other;
                    return Err(ServiceError::InvalidTransition {
                        from,
                        action: "serve",
                    });
                }
            };

            let local_addr = server.local_addr();
            let (done_tx, done) = watch::channel(false);
            let shutdown = shutdown_requested(self.shutdown.subscribe());
            let task = tokio::spawn(async move {
                let result = server.run(shutdown).await;
                done_tx.send_replace(true);
                result
            });
            *phase = Phase::Serving {
                abort: task.abort_handle(),
                done,
            };
            (task, local_addr)
        };

        info!(%local_addr, "debugger serving");
        let outcome = task.await;
        *self.lock_phase() = Phase::Stopped;

        match outcome {
            Ok(result) => result.map_err(ServiceError::from),
            Err(e) if e.is_cancelled() => {
                debug!("query server task aborted");
                Ok(())
            }
            Err(e) => Err(ServiceError::Server(ServerError::Serve(format!(
                "server task failed: {e}"
            )))),
        }
    }

    /// Close the ingest path, empty the ring, and shut the HTTP server
    /// down.
    ///
    /// Once this returns, `debugger.SendDebugInfo` fails and the ring stays
    /// empty. Waits up to the configured grace period for open connections to
    /// drain, then aborts the server. Calling `stop` again, or before
    /// `init`, does nothing.
    pub async fn stop(&self) {
        if let Some(bound) = self.bound.get() {
            bound.ingest.close();
            bound.buffer.reset(bound.capacity);
        }

        let previous = std::mem::replace(&mut *self.lock_phase(), Phase::Stopped);
        match previous {
            Phase::Uninitialized | Phase::Stopped => {
                debug!("stop requested with nothing running");
            }
            Phase::Initialized(server) => {
                drop(server);
                info!("debugger stopped before serving; listener released");
            }
            Phase::Serving { abort, mut done } => {
                self.shutdown.send_replace(true);
                let grace = self.bound.get().map_or(Duration::ZERO, |b| b.grace);

                if tokio::time::timeout(grace, done.wait_for(|finished| *finished))
                    .await
                    .is_err()
                {
                    warn!(
                        grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                        "graceful shutdown deadline exceeded, abandoning open connections"
                    );
                    abort.abort();
                } else {
                    info!("debugger stopped");
                }
            }
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ServiceState {
        self.lock_phase().state()
    }

    /// Handle to the ring, once initialized.
    pub fn buffer(&self) -> Option<EventBuffer> {
        self.bound.get().map(|b| b.buffer.clone())
    }

    /// Address the HTTP listener is bound to, once initialized.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound.get().map(|b| b.local_addr)
    }

    fn require_state(
        &self,
        expected: ServiceState,
        action: &'static str,
    ) -> Result<(), ServiceError> {
        let from = self.state();
        if from == expected {
            Ok(())
        } else {
            Err(ServiceError::InvalidTransition { from, action })
        }
    }

    fn lock_phase(&self) -> MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resolves once a stop has been requested or the service is dropped.
async fn shutdown_requested(mut requested: watch::Receiver<bool>) {
    if requested.wait_for(|stop| *stop).await.is_err() {
        debug!("shutdown channel closed");
    }
}
