//! Core state and ingest path for the ringlog debug collector.
//!
//! This crate holds everything that does not depend on the HTTP surface:
//!
//! - [`Event`] -- a schema-free JSON object representing one debug entry
//! - [`RingBuffer`] / [`EventBuffer`] -- the fixed-capacity store of the
//!   most recent events and its shared, mutex-guarded handle
//! - [`EventIngest`] -- decodes raw payloads and appends them
//! - [`RpcRegistry`] -- in-process dispatch of `service.Method` calls
//! - [`config`] -- typed configuration loaded from YAML plus environment
//!   overrides
//!
//! # Data flow
//!
//! ```text
//! RPC call -> EventIngest::ingest -> EventBuffer::append
//! HTTP GET -> EventBuffer::snapshot -> JSON array
//! ```

pub mod buffer;
pub mod config;
pub mod event;
pub mod ingest;
pub mod rpc;

pub use buffer::{BufferError, EventBuffer, RingBuffer};
pub use config::{ConfigError, DebuggerConfig, DecodePolicy, HostConfig};
pub use event::Event;
pub use ingest::{EventIngest, IngestError, ACK, SEND_DEBUG_INFO, SERVICE_NAME};
pub use rpc::{RpcError, RpcRegistry, RpcService};
