//! Error types for the host binary.
//!
//! [`HostError`] is the top-level error type that wraps every failure mode
//! during startup and shutdown.

/// Top-level error for the host binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ringlog_core::ConfigError,
    },

    /// The debug collector failed to initialize or serve.
    #[error("debugger error: {source}")]
    Service {
        /// The underlying service error.
        #[from]
        source: ringlog_server::ServiceError,
    },

    /// The JSON-RPC listener failed.
    #[error("RPC listener error: {message}")]
    Rpc {
        /// Description of the listener failure.
        message: String,
    },

    /// A background task panicked or was cancelled.
    #[error("task error: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}
