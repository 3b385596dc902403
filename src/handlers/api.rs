use std::sync::Arc;

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::core::pages::Page;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    let serving = if config.site.serving_public() {
        "public"
    } else {
        "build"
    };
    let pages: Vec<&str> = Page::ALL.iter().map(|page| page.path()).collect();

    Json(json!({
        "status": "OK",
        "serving": serving,
        "proxy_target": config.proxy.target,
        "api_key_configured": state.credentials.api_key().is_some(),
        "relay_configured": config.local_relay_server_url.is_some(),
        "pages": pages,
    }))
}
