//! Decoding inbound payloads into the ring.
//!
//! [`EventIngest`] is the only write path into an [`EventBuffer`]. It is
//! exposed to RPC callers as the `debugger.SendDebugInfo` method. Once
//! [`EventIngest::close`] returns, no call writes into the buffer again.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace, warn};

use crate::buffer::EventBuffer;
use crate::config::DecodePolicy;
use crate::event::Event;
use crate::rpc::{RpcError, RpcService};

/// Name the ingest service registers under.
pub const SERVICE_NAME: &str = "debugger";

/// The single method the ingest service exposes.
pub const SEND_DEBUG_INFO: &str = "SendDebugInfo";

/// Acknowledgement returned for every accepted payload.
pub const ACK: &str = "OK";

/// Errors surfaced to ingest callers.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The payload was not a JSON object. Only returned under
    /// [`DecodePolicy::Strict`].
    #[error("payload is not a JSON object: {0}")]
    Decode(#[from] serde_json::Error),

    /// The collector has been stopped.
    #[error("debug ingest is closed")]
    Closed,
}

/// Decodes payloads and appends them to a shared buffer.
///
/// Clones share the buffer and the closed flag.
#[derive(Debug, Clone)]
pub struct EventIngest {
    buffer: EventBuffer,
    policy: DecodePolicy,
    /// Held for reading across each append; `close` takes it for writing.
    closed: Arc<RwLock<bool>>,
}

impl EventIngest {
    /// Create an ingest path writing into `buffer`.
    pub fn new(buffer: EventBuffer, policy: DecodePolicy) -> Self {
        Self {
            buffer,
            policy,
            closed: Arc::new(RwLock::new(false)),
        }
    }

    /// Refuse every later call with [`IngestError::Closed`].
    ///
    /// Waits for appends already in progress, so the buffer can be reset
    /// right after this returns and stay empty.
    pub fn close(&self) {
        *self.closed.write().unwrap_or_else(PoisonError::into_inner) = true;
        debug!("debug ingest closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decode `raw` and append it.
    ///
    /// Under [`DecodePolicy::Lenient`] a malformed payload is recorded as an
    /// empty event and still acknowledged. Under [`DecodePolicy::Strict`] it
    /// is rejected and nothing is recorded. After [`close`](Self::close)
    /// every call fails with [`IngestError::Closed`].
    pub fn ingest(&self, raw: &str) -> Result<&'static str, IngestError> {
        let closed = self.closed.read().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return Err(IngestError::Closed);
        }

        let event = match Event::from_json(raw) {
            Ok(event) => event,
            Err(e) => match self.policy {
                DecodePolicy::Lenient => {
                    warn!(error = %e, "undecodable debug payload recorded as empty event");
                    Event::empty()
                }
                DecodePolicy::Strict => {
                    warn!(error = %e, "undecodable debug payload rejected");
                    return Err(IngestError::Decode(e));
                }
            },
        };

        trace!(fields = event.len(), "debug event ingested");
        self.buffer.append(event);
        Ok(ACK)
    }

    /// The buffer this ingest path writes into.
    pub const fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }
}

impl RpcService for EventIngest {
    fn call(&self, method: &str, input: &str) -> Result<String, RpcError> {
        if method != SEND_DEBUG_INFO {
            return Err(RpcError::MethodNotFound {
                service: SERVICE_NAME.to_owned(),
                method: method.to_owned(),
            });
        }
        self.ingest(input)
            .map(ToOwned::to_owned)
            .map_err(|e| RpcError::Call(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::*;
    use crate::rpc::RpcRegistry;

    fn ingest(policy: DecodePolicy) -> EventIngest {
        EventIngest::new(EventBuffer::with_capacity(4).unwrap(), policy)
    }

    #[test]
    fn valid_payload_round_trips() {
        let ingest = ingest(DecodePolicy::Lenient);
        let raw = r#"{"file":"index.php","line":7,"nested":{"a":[1,true,null]},"epochms":1}"#;
        assert_eq!(ingest.ingest(raw).unwrap(), ACK);

        let snapshot = ingest.buffer().snapshot();
        assert_eq!(snapshot.len(), 1);
        let expected: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(serde_json::to_value(snapshot.first().unwrap()).unwrap(), expected);
    }

    #[test]
    fn lenient_records_empty_event_for_garbage() {
        let ingest = ingest(DecodePolicy::Lenient);
        assert_eq!(ingest.ingest("not valid json").unwrap(), ACK);

        let snapshot = ingest.buffer().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.first().unwrap().is_empty());
    }

    #[test]
    fn lenient_treats_non_object_json_as_empty() {
        let ingest = ingest(DecodePolicy::Lenient);
        ingest.ingest("[1,2]").unwrap();
        assert_eq!(
            serde_json::to_value(ingest.buffer().snapshot()).unwrap(),
            json!([{}])
        );
    }

    #[test]
    fn strict_rejects_garbage_without_recording() {
        let ingest = ingest(DecodePolicy::Strict);
        assert!(matches!(
            ingest.ingest("not valid json"),
            Err(IngestError::Decode(_))
        ));
        assert!(ingest.buffer().is_empty());

        ingest.ingest(r#"{"ok":true}"#).unwrap();
        assert_eq!(ingest.buffer().len(), 1);
    }

    #[test]
    fn closed_ingest_rejects_and_records_nothing() {
        let ingest = ingest(DecodePolicy::Lenient);
        ingest.ingest(r#"{"before":1}"#).unwrap();
        assert!(!ingest.is_closed());

        ingest.close();
        ingest.buffer().reset(ingest.buffer().capacity().try_into().unwrap());
        assert!(ingest.is_closed());
        assert!(matches!(
            ingest.ingest(r#"{"after":1}"#),
            Err(IngestError::Closed)
        ));
        assert!(matches!(
            ingest.ingest("not valid json"),
            Err(IngestError::Closed)
        ));
        assert!(ingest.buffer().is_empty());
    }

    #[test]
    fn close_is_shared_by_clones() {
        let ingest = ingest(DecodePolicy::Strict);
        let registry = RpcRegistry::new();
        registry.register(SERVICE_NAME, Arc::new(ingest.clone()));

        ingest.close();
        assert_eq!(
            registry.call("debugger.SendDebugInfo", r#"{"x":1}"#),
            Err(RpcError::Call("debug ingest is closed".to_owned()))
        );
        assert!(ingest.buffer().is_empty());
    }

    #[test]
    fn exposed_through_registry() {
        let ingest = ingest(DecodePolicy::Strict);
        let registry = RpcRegistry::new();
        registry.register(SERVICE_NAME, Arc::new(ingest.clone()));

        let reply = registry.call("debugger.SendDebugInfo", r#"{"x":1}"#).unwrap();
        assert_eq!(reply, "OK");
        assert_eq!(ingest.buffer().len(), 1);

        assert!(matches!(
            registry.call("debugger.SendDebugInfo", "{"),
            Err(RpcError::Call(_))
        ));
        assert!(matches!(
            registry.call("debugger.Other", "{}"),
            Err(RpcError::MethodNotFound { .. })
        ));
    }
}
