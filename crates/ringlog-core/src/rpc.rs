//! In-process RPC dispatch.
//!
//! Services register under a name and are invoked with a dotted method
//! name, `service.Method`, and a single string argument. This is the
//! registration point the lifecycle controller uses to expose the ingest
//! path; the network transport in front of it is someone else's concern.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

/// Errors returned by [`RpcRegistry::call`] and [`RpcService::call`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// The method name is not of the form `service.Method`.
    #[error("invalid method name: {0}")]
    InvalidMethod(String),

    /// No service is registered under the given name.
    #[error("service not found: {0}")]
    ServiceNotFound(String),

    /// The service exists but does not expose the method.
    #[error("method not found: {service}.{method}")]
    MethodNotFound {
        /// Name of the service that was reached.
        service: String,
        /// Name of the missing method.
        method: String,
    },

    /// The method ran and reported a failure.
    #[error("{0}")]
    Call(String),
}

/// A named group of string-in, string-out methods.
pub trait RpcService: Send + Sync {
    /// Invoke `method` with `input`.
    fn call(&self, method: &str, input: &str) -> Result<String, RpcError>;
}

/// Registry of [`RpcService`]s keyed by service name.
#[derive(Default)]
pub struct RpcRegistry {
    services: RwLock<BTreeMap<String, Arc<dyn RpcService>>>,
}

impl std::fmt::Debug for RpcRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcRegistry")
            .field("services", &self.service_names())
            .finish()
    }
}

impl RpcRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under `name`, replacing any previous service
    /// with the same name.
    pub fn register(&self, name: &str, service: Arc<dyn RpcService>) {
        let replaced = self
            .services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_owned(), service)
            .is_some();
        debug!(service = name, replaced, "RPC service registered");
    }

    /// Dispatch `service.Method` with `input`.
    pub fn call(&self, method: &str, input: &str) -> Result<String, RpcError> {
        let (service_name, method_name) = method
            .rsplit_once('.')
            .filter(|(s, m)| !s.is_empty() && !m.is_empty())
            .ok_or_else(|| RpcError::InvalidMethod(method.to_owned()))?;

        // Clone the Arc out so the registry lock is not held during the call.
        let service = self
            .services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service_name)
            .cloned()
            .ok_or_else(|| RpcError::ServiceNotFound(service_name.to_owned()))?;

        service.call(method_name, input)
    }

    /// Names of all registered services, sorted.
    pub fn service_names(&self) -> Vec<String> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct Echo;

    impl RpcService for Echo {
        fn call(&self, method: &str, input: &str) -> Result<String, RpcError> {
            match method {
                "Say" => Ok(input.to_owned()),
                other => Err(RpcError::MethodNotFound {
                    service: "echo".to_owned(),
                    method: other.to_owned(),
                }),
            }
        }
    }

    #[test]
    fn dispatches_to_registered_service() {
        let registry = RpcRegistry::new();
        registry.register("echo", Arc::new(Echo));
        assert_eq!(registry.call("echo.Say", "hi").unwrap(), "hi");
        assert_eq!(registry.service_names(), vec!["echo".to_owned()]);
    }

    #[test]
    fn unknown_service_and_method() {
        let registry = RpcRegistry::new();
        registry.register("echo", Arc::new(Echo));
        assert_eq!(
            registry.call("nope.Say", ""),
            Err(RpcError::ServiceNotFound("nope".to_owned()))
        );
        assert!(matches!(
            registry.call("echo.Shout", ""),
            Err(RpcError::MethodNotFound { .. })
        ));
    }

    #[test]
    fn malformed_method_names() {
        let registry = RpcRegistry::new();
        for name in ["", "echo", ".Say", "echo."] {
            assert_eq!(
                registry.call(name, ""),
                Err(RpcError::InvalidMethod(name.to_owned()))
            );
        }
    }
}
