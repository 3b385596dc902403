//! `/api` reverse proxy.
//!
//! Requests under `/api` are forwarded to the configured target with the
//! prefix removed. Hop-by-hop headers are dropped in both directions. The
//! request body is buffered; the upstream body is streamed back unchanged.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, Uri, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Path prefix removed before forwarding.
pub const API_PREFIX: &str = "/api";

/// Largest request body forwarded upstream.
const MAX_REQUEST_BODY: usize = 32 * 1024 * 1024;

const HOP_BY_HOP: [header::HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

/// Build the upstream URL for `uri`: `/api/x?q=1` becomes `{target}/x?q=1`.
pub fn upstream_url(target: &str, uri: &Uri) -> String {
    let path = uri.path();
    let stripped = path.strip_prefix(API_PREFIX).unwrap_or(path);
    let stripped = if stripped.is_empty() { "/" } else { stripped };

    let mut url = format!("{}{}", target.trim_end_matches('/'), stripped);
    if let Some(query) = uri.query() {
        url.push('?');
        url.push_str(query);
    }
    url
}

/// Copy headers, skipping hop-by-hop ones (including `Keep-Alive`, which has
/// no typed constant).
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !HOP_BY_HOP.contains(name) && name.as_str() != "keep-alive")
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Forward the request to the proxy target.
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> AppResult<Response> {
    let target = state
        .config
        .proxy
        .target
        .as_deref()
        .ok_or_else(|| AppError::Upstream("API proxy is disabled".to_string()))?;

    let (parts, body) = request.into_parts();
    let url = upstream_url(target, &parts.uri);
    info!(method = %parts.method, %url, "Proxying request");

    let body = axum::body::to_bytes(body, MAX_REQUEST_BODY)
        .await
        .map_err(|e| AppError::BadRequest(format!("failed to read request body: {e}")))?;

    // Host is left out; the client derives it from the target URL.
    let upstream = state
        .proxy_client
        .request(parts.method, &url)
        .headers(forwardable_headers(&parts.headers))
        .body(body)
        .send()
        .await?;

    let status = upstream.status();
    debug!(%status, %url, "Upstream responded");
    let headers = forwardable_headers(upstream.headers());

    let mut response = Body::from_stream(upstream.bytes_stream()).into_response();
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_upstream_url_strips_prefix_and_keeps_query() {
        let uri: Uri = "/api/sql/query?limit=10&db=main".parse().unwrap();
        assert_eq!(
            upstream_url("https://upstream.example.com/", &uri),
            "https://upstream.example.com/sql/query?limit=10&db=main"
        );
    }

    #[test]
    fn test_upstream_url_bare_prefix() {
        let uri: Uri = "/api".parse().unwrap();
        assert_eq!(upstream_url("http://localhost:9000", &uri), "http://localhost:9000/");
        let uri: Uri = "/api?x=1".parse().unwrap();
        assert_eq!(
            upstream_url("http://localhost:9000", &uri),
            "http://localhost:9000/?x=1"
        );
    }

    #[test]
    fn test_hop_by_hop_headers_removed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("localhost:3006"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let forwarded = forwardable_headers(&headers);
        assert_eq!(forwarded.len(), 2);
        assert!(forwarded.contains_key(header::AUTHORIZATION));
        assert!(forwarded.contains_key(header::CONTENT_TYPE));
    }
}
