//! Static site route configuration

use axum::{
    Router,
    routing::{MethodRouter, get},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers::site::spa_index;
use crate::state::AppState;
use std::sync::Arc;

/// Create the single-page app router
///
/// `/` and `/index.html` always render the templated index. Other paths are
/// looked up under the site root (build if present, else public) and fall
/// back to the templated index when no file matches.
pub fn create_site_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let spa_fallback: MethodRouter = get(spa_index).with_state(state.clone());
    let assets = ServeDir::new(state.config.site.root())
        .append_index_html_on_directories(false)
        .fallback(spa_fallback);

    Router::new()
        .route("/", get(spa_index))
        .route("/index.html", get(spa_index))
        .fallback_service(assets)
        .layer(TraceLayer::new_for_http())
}
