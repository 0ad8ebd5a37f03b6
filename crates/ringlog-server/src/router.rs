//! Axum router construction for the query server.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing middleware.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /debuglogs` -- retained events as JSON
/// - `GET /`, `GET /index.html` -- viewer page
/// - `GET /css/{*path}`, `GET /js/{*path}` -- viewer assets
///
/// Any other path falls through to Axum's default 404.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/debuglogs", get(handlers::debug_logs))
        // Viewer
        .route("/", get(handlers::index))
        .route("/index.html", get(handlers::index))
        .route("/css/{*path}", get(handlers::css))
        .route("/js/{*path}", get(handlers::js))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
