//! HTTP endpoint handlers for the query server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/debuglogs` | All retained events, oldest first |
//! | `GET` | `/`, `/index.html` | Viewer page |
//! | `GET` | `/css/*`, `/js/*` | Viewer stylesheets and scripts |

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ringlog_core::Event;
use tracing::debug;

use crate::assets;
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /debuglogs
// ---------------------------------------------------------------------------

/// Return every retained event as a JSON array.
///
/// An empty ring yields `[]`. No filtering or pagination.
#[allow(clippy::unused_async)]
pub async fn debug_logs(State(state): State<Arc<AppState>>) -> Json<Vec<Event>> {
    let events = state.buffer.snapshot();
    debug!(count = events.len(), "serving debug log snapshot");
    Json(events)
}

// ---------------------------------------------------------------------------
// Static assets
// ---------------------------------------------------------------------------

/// Serve the viewer page for `/` and `/index.html`.
#[allow(clippy::unused_async)]
pub async fn index() -> Result<Response, ApiError> {
    serve_asset("index.html")
}

/// Serve a stylesheet from `/css/*`.
#[allow(clippy::unused_async)]
pub async fn css(Path(path): Path<String>) -> Result<Response, ApiError> {
    serve_asset(&format!("css/{path}"))
}

/// Serve a script from `/js/*`.
#[allow(clippy::unused_async)]
pub async fn js(Path(path): Path<String>) -> Result<Response, ApiError> {
    serve_asset(&format!("js/{path}"))
}

fn serve_asset(path: &str) -> Result<Response, ApiError> {
    let asset =
        assets::lookup(path).ok_or_else(|| ApiError::NotFound(format!("asset {path}")))?;
    Ok(([(header::CONTENT_TYPE, asset.content_type())], asset.body).into_response())
}
