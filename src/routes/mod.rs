//! Route configuration
//!
//! - `api` - Server health endpoint
//! - `proxy` - `/api` reverse proxy
//! - `site` - Static assets and the single-page app fallback

pub mod api;
pub mod proxy;
pub mod site;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Assemble every route with state applied.
///
/// Server endpoints and the proxy take precedence over the static fallback.
pub fn create_app(state: Arc<AppState>) -> Router {
    api::create_api_router()
        .merge(proxy::create_proxy_router(&state))
        .merge(site::create_site_router(state.clone()))
        .with_state(state)
}
