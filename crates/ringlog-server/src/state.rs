//! Shared application state for the query server.

use ringlog_core::EventBuffer;

/// State injected into every handler via Axum's `State` extractor.
///
/// Holds a handle to the same ring the ingest path writes into.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The shared event ring.
    pub buffer: EventBuffer,
}

impl AppState {
    /// Wrap a buffer handle.
    pub const fn new(buffer: EventBuffer) -> Self {
        Self { buffer }
    }
}
