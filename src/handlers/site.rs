//! Single-page app fallback: every route the static files do not match
//! renders `index.html` with `%PUBLIC_URL%` filled in.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{extract::State, response::Html};
use tracing::debug;

use crate::config::SiteConfig;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

const PUBLIC_URL_PLACEHOLDER: &str = "%PUBLIC_URL%";

/// Serve the templated `index.html`.
pub async fn spa_index(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    render_index(&state.config.site).await.map(Html)
}

/// Candidate `index.html` locations, in lookup order.
fn index_candidates(site: &SiteConfig) -> [PathBuf; 2] {
    [
        site.build_dir.join("index.html"),
        site.public_dir.join("index.html"),
    ]
}

/// Read the first existing `index.html` and substitute the public URL.
pub async fn render_index(site: &SiteConfig) -> AppResult<String> {
    for path in index_candidates(site) {
        match tokio::fs::read_to_string(&path).await {
            Ok(html) => {
                debug!(path = %path.display(), "Serving index.html");
                return Ok(html.replace(PUBLIC_URL_PLACEHOLDER, &site.public_url));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Err(AppError::IndexRead(e)),
        }
    }
    Err(AppError::IndexNotFound)
}
