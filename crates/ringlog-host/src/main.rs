//! Host binary for the ringlog debug collector.
//!
//! Plays the part of the plugin container: it loads configuration,
//! initializes the [`DebuggerService`], exposes the RPC registry over a
//! JSON-RPC TCP socket, and drives shutdown when the process is signalled.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `ringlog.yaml` (or the path given as the
//!    first argument, or `RINGLOG_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Initialize the debugger: ring buffer, HTTP listener, RPC method
//! 4. Bind the JSON-RPC listener
//! 5. Serve until `Ctrl-C`/`SIGTERM` or a fatal server error
//! 6. Stop the debugger (empties the ring, bounded HTTP drain)

mod error;
mod rpc_listener;

use std::path::PathBuf;
use std::sync::Arc;

use ringlog_core::config::{LogFormat, LoggingConfig};
use ringlog_core::{HostConfig, RpcRegistry};
use ringlog_server::DebuggerService;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::HostError;
use crate::rpc_listener::RpcListener;

/// Config file used when neither an argument nor `RINGLOG_CONFIG` is given.
const DEFAULT_CONFIG_PATH: &str = "ringlog.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, a listener cannot bind,
/// or the HTTP server fails while running.
#[tokio::main]
async fn main() -> Result<(), HostError> {
    let config = HostConfig::from_file(&config_path())?;
    init_logging(&config.logging);

    info!(
        history_size = config.debugger.history_size,
        address = config.debugger.address,
        rpc_listen = config.rpc.listen,
        "ringlog starting"
    );

    run(&config).await?;

    info!("ringlog shutdown complete");
    Ok(())
}

/// Wire the service and transport together and block until shutdown.
async fn run(config: &HostConfig) -> Result<(), HostError> {
    let registry = Arc::new(RpcRegistry::new());
    let service = Arc::new(DebuggerService::new());
    service.init(&config.debugger, &registry).await?;

    let rpc = RpcListener::bind(&config.rpc.listen, Arc::clone(&registry)).await?;
    let (stop_rpc, stop_rpc_rx) = watch::channel(false);
    let rpc_task = tokio::spawn(rpc.run(stop_rpc_rx));

    let mut serving = tokio::spawn({
        let service = Arc::clone(&service);
        async move { service.serve().await }
    });

    let outcome = tokio::select! {
        () = shutdown_signal() => None,
        result = &mut serving => Some(result),
    };

    // Refuse new RPC connections; stop() closes ingest for open ones.
    stop_rpc.send_replace(true);
    service.stop().await;

    let result = match outcome {
        Some(result) => result,
        None => serving.await,
    };
    if let Err(e) = rpc_task.await {
        warn!(error = %e, "RPC listener task failed");
    }

    result
        .map_err(|e| HostError::Task {
            message: format!("debugger task failed: {e}"),
        })?
        .map_err(HostError::from)
}

/// Resolve the config file location.
fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("RINGLOG_CONFIG"))
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the
/// configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Wait for `Ctrl-C`, or `SIGTERM` on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received");
}
