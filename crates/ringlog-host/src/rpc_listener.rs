//! Line-delimited JSON-RPC transport in front of the [`RpcRegistry`].
//!
//! Each line a client writes is one request; each request gets exactly one
//! response line. The framing matches Go's `net/rpc/jsonrpc` codec, so
//! existing debug clients can call `debugger.SendDebugInfo` unchanged:
//!
//! ```text
//! -> {"method":"debugger.SendDebugInfo","params":["{\"x\":1}"],"id":1}
//! <- {"id":1,"result":"OK","error":null}
//! ```
//!
//! A line that is not a valid request gets an error response with a null
//! `id`; the connection stays open.

#[cfg(test)]
use std::net::SocketAddr;
use std::sync::Arc;

use ringlog_core::RpcRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::HostError;

/// One decoded request line.
#[derive(Debug, Deserialize)]
struct RpcRequest {
    method: String,
    #[serde(default)]
    params: Vec<Value>,
    #[serde(default)]
    id: Value,
}

/// One response line.
#[derive(Debug, Serialize, PartialEq)]
struct RpcResponse {
    id: Value,
    result: Option<String>,
    error: Option<String>,
}

impl RpcResponse {
    const fn ok(id: Value, result: String) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    const fn err(id: Value, error: String) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A bound JSON-RPC listener.
#[derive(Debug)]
pub struct RpcListener {
    listener: TcpListener,
    registry: Arc<RpcRegistry>,
}

impl RpcListener {
    /// Bind `address` and dispatch incoming calls to `registry`.
    pub async fn bind(address: &str, registry: Arc<RpcRegistry>) -> Result<Self, HostError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| HostError::Rpc {
                message: format!("bind failed on {address}: {e}"),
            })?;
        Ok(Self { listener, registry })
    }

    /// The bound address.
    #[cfg(test)]
    pub fn local_addr(&self) -> Result<SocketAddr, HostError> {
        self.listener.local_addr().map_err(|e| HostError::Rpc {
            message: format!("no local address: {e}"),
        })
    }

    /// Accept connections until `shutdown` flips to `true`.
    ///
    /// Connections already open keep running until their clients hang up.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "RPC listener accepting");
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "RPC client connected");
                        let registry = Arc::clone(&self.registry);
                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(stream, &registry).await {
                                debug!(%peer, error = %e, "RPC connection closed with error");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "failed to accept RPC connection"),
                },
                () = stop_requested(&mut shutdown) => break,
            }
        }

        info!("RPC listener stopped");
    }
}

/// Resolves once `shutdown` flips to `true` or its sender is dropped.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        debug!("RPC shutdown channel closed");
    }
}

/// Answer every request line on `stream` until EOF.
async fn serve_connection(stream: TcpStream, registry: &RpcRegistry) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(registry, &line);
        let mut encoded = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
        encoded.push(b'\n');
        writer.write_all(&encoded).await?;
    }
    Ok(())
}

/// Decode one request line and dispatch it.
fn handle_line(registry: &RpcRegistry, line: &str) -> RpcResponse {
    let request: RpcRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => return RpcResponse::err(Value::Null, format!("invalid request: {e}")),
    };

    // The single argument is normally a JSON string holding the encoded
    // event; any other JSON value is passed through in its encoded form.
    let input = match request.params.into_iter().next() {
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
        None => {
            return RpcResponse::err(request.id, "missing params".to_owned());
        }
    };

    match registry.call(&request.method, &input) {
        Ok(result) => RpcResponse::ok(request.id, result),
        Err(e) => RpcResponse::err(request.id, e.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ringlog_core::{DecodePolicy, EventBuffer, EventIngest, SERVICE_NAME};
    use serde_json::json;

    use super::*;

    fn registry() -> (Arc<RpcRegistry>, EventBuffer) {
        let buffer = EventBuffer::with_capacity(4).unwrap();
        let registry = RpcRegistry::new();
        registry.register(
            SERVICE_NAME,
            Arc::new(EventIngest::new(buffer.clone(), DecodePolicy::Lenient)),
        );
        (Arc::new(registry), buffer)
    }

    #[test]
    fn send_debug_info_line() {
        let (registry, buffer) = registry();
        let line = json!({
            "method": "debugger.SendDebugInfo",
            "params": [r#"{"x":1}"#],
            "id": 7
        })
        .to_string();

        let response = handle_line(&registry, &line);
        assert_eq!(response, RpcResponse::ok(json!(7), "OK".to_owned()));
        assert_eq!(
            serde_json::to_value(buffer.snapshot()).unwrap(),
            json!([{ "x": 1 }])
        );
    }

    #[test]
    fn object_param_is_accepted() {
        let (registry, buffer) = registry();
        let line = r#"{"method":"debugger.SendDebugInfo","params":[{"y":2}],"id":1}"#;
        assert_eq!(handle_line(&registry, line).result.as_deref(), Some("OK"));
        assert_eq!(
            serde_json::to_value(buffer.snapshot()).unwrap(),
            json!([{ "y": 2 }])
        );
    }

    #[test]
    fn errors_are_reported_per_line() {
        let (registry, buffer) = registry();

        let response = handle_line(&registry, "garbage");
        assert_eq!(response.id, Value::Null);
        assert!(response.error.unwrap().starts_with("invalid request"));

        let response = handle_line(&registry, r#"{"method":"debugger.SendDebugInfo","id":2}"#);
        assert_eq!(response.error.as_deref(), Some("missing params"));

        let response = handle_line(&registry, r#"{"method":"nope.Call","params":["x"],"id":3}"#);
        assert_eq!(response.id, json!(3));
        assert_eq!(response.error.as_deref(), Some("service not found: nope"));

        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn round_trip_over_tcp() {
        let (registry, buffer) = registry();
        let listener = RpcListener::bind("127.0.0.1:0", registry).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stop_rx) = watch::channel(false);
        let running = tokio::spawn(listener.run(stop_rx));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut replies = BufReader::new(reader).lines();

        writer
            .write_all(b"{\"method\":\"debugger.SendDebugInfo\",\"params\":[\"{\\\"a\\\":true}\"],\"id\":1}\n")
            .await
            .unwrap();
        writer.write_all(b"not json\n").await.unwrap();

        let first: Value =
            serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(first, json!({ "id": 1, "result": "OK", "error": null }));
        let second: Value =
            serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(second["id"], Value::Null);
        assert!(second["error"].is_string());

        assert_eq!(
            serde_json::to_value(buffer.snapshot()).unwrap(),
            json!([{ "a": true }])
        );

        stop.send_replace(true);
        running.await.unwrap();
    }
}
