//! Configuration loading and typed config structures for ringlog.
//!
//! The host reads a single YAML file (`ringlog.yaml` by default). This
//! module defines strongly-typed structs that mirror the YAML structure,
//! a loader, environment overrides, and the validation the lifecycle
//! controller runs before it allocates anything.
//!
//! ```yaml
//! rpc:
//!   listen: "127.0.0.1:6001"
//! debugger:
//!   history_size: 100
//!   address: "127.0.0.1:8089"
//!   shutdown_timeout_ms: 10000
//!   decode_policy: lenient
//! logging:
//!   level: info
//!   format: pretty
//! ```

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content, including missing required keys.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// `history_size` must be a positive integer.
    #[error("history_size must be at least 1, got {0}")]
    InvalidHistorySize(usize),

    /// A listen address is not of the form `host:port`.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidOverride {
        /// The environment variable name.
        var: &'static str,
        /// The raw value.
        value: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Overrides `debugger.history_size`.
pub const ENV_HISTORY_SIZE: &str = "RINGLOG_HISTORY_SIZE";
/// Overrides `debugger.address`.
pub const ENV_ADDRESS: &str = "RINGLOG_ADDRESS";
/// Overrides `rpc.listen`.
pub const ENV_RPC_LISTEN: &str = "RINGLOG_RPC_LISTEN";
/// Overrides `logging.level`.
pub const ENV_LOG_LEVEL: &str = "RINGLOG_LOG_LEVEL";

/// Top-level host configuration.
///
/// Mirrors the structure of `ringlog.yaml`. Only the `debugger` section
/// is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    /// Inbound RPC transport settings.
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Debug collector settings.
    pub debugger: DebuggerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl HostConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid, or
    /// [`ConfigError::InvalidOverride`] if an override is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides looked up through `lookup`.
    ///
    /// `lookup` is normally `std::env::var`; tests pass a map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_HISTORY_SIZE) {
            let Ok(history_size) = value.trim().parse::<usize>() else {
                return Err(ConfigError::InvalidOverride {
                    var: ENV_HISTORY_SIZE,
                    value,
                });
            };
            self.debugger.history_size = history_size;
        }
        if let Some(value) = lookup(ENV_ADDRESS) {
            self.debugger.address = value;
        }
        if let Some(value) = lookup(ENV_RPC_LISTEN) {
            self.rpc.listen = value;
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = value;
        }
        Ok(())
    }
}

/// How the ingest path treats payloads that are not JSON objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
    /// Record an empty event and acknowledge as usual.
    #[default]
    Lenient,
    /// Reject the call with an error and record nothing.
    Strict,
}

/// Debug collector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DebuggerConfig {
    /// Number of events retained.
    #[serde(alias = "historySize")]
    pub history_size: usize,

    /// HTTP listen address, `host:port` or `:port`.
    pub address: String,

    /// Grace period for HTTP shutdown, in milliseconds.
    #[serde(default = "default_shutdown_timeout_ms", alias = "shutdownTimeoutMs")]
    pub shutdown_timeout_ms: u64,

    /// Handling of undecodable payloads.
    #[serde(default, alias = "decodePolicy")]
    pub decode_policy: DecodePolicy,
}

impl DebuggerConfig {
    /// Build a config with the two required settings and defaults for
    /// the rest.
    pub fn new(history_size: usize, address: impl Into<String>) -> Self {
        Self {
            history_size,
            address: address.into(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            decode_policy: DecodePolicy::default(),
        }
    }

    /// The ring capacity, or an error if `history_size` is zero.
    pub fn capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.history_size)
            .ok_or(ConfigError::InvalidHistorySize(self.history_size))
    }

    /// The address to bind, with a bare `:port` expanded to all interfaces.
    pub fn bind_address(&self) -> Result<String, ConfigError> {
        normalize_address(&self.address)
    }

    /// The HTTP shutdown grace period.
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Check every setting, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capacity()?;
        self.bind_address()?;
        Ok(())
    }
}

/// Inbound RPC transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcConfig {
    /// TCP address the JSON-RPC listener binds to.
    #[serde(default = "default_rpc_listen")]
    pub listen: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen: default_rpc_listen(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Expand `:port` to `0.0.0.0:port` and check that a numeric port is
/// present.
pub fn normalize_address(address: &str) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidAddress {
        address: address.to_owned(),
        reason: reason.to_owned(),
    };

    let address = address.trim();
    let full = if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_owned()
    };

    let (host, port) = full
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected host:port"))?;
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    port.parse::<u16>()
        .map_err(|_parse| invalid("port must be a number between 0 and 65535"))?;

    Ok(full)
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

fn default_rpc_listen() -> String {
    "127.0.0.1:6001".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
