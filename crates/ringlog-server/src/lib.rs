//! HTTP query surface and lifecycle controller for the ringlog collector.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`GET /debuglogs`** -- every event currently held in the ring, as a
//!   JSON array, oldest first
//! - **Static viewer** (`GET /`, `/index.html`, `/css/*`, `/js/*`) compiled
//!   into the binary
//!
//! and a [`DebuggerService`] that owns the ring buffer, registers the
//! ingest path with an [`RpcRegistry`](ringlog_core::RpcRegistry), and drives
//! the `Uninitialized -> Initialized -> Serving -> Stopped` lifecycle.
//!
//! # Architecture
//!
//! The ingest path and the HTTP handlers share one
//! [`EventBuffer`](ringlog_core::EventBuffer). Requests never hold the
//! buffer lock across an `.await`; each read takes a snapshot and
//! serializes it after the lock is released.

pub mod assets;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod service;
pub mod state;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{QueryServer, ServerError};
pub use service::{DebuggerService, ServiceError, ServiceState};
pub use state::AppState;
