use axum::{Router, routing::any};
use tower_http::trace::TraceLayer;

use crate::handlers::proxy::proxy_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the `/api` reverse proxy router
///
/// `/api` and everything below it is forwarded for any method. Returns an
/// empty router when no target is configured so the paths fall through to
/// the single-page app.
pub fn create_proxy_router(state: &AppState) -> Router<Arc<AppState>> {
    if !state.config.is_proxy_enabled() {
        return Router::new();
    }
    Router::new()
        .route("/api", any(proxy_handler))
        .route("/api/{*path}", any(proxy_handler))
        .layer(TraceLayer::new_for_http())
}
