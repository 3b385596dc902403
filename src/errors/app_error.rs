use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors raised by the site and proxy handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Neither the build nor the public directory holds `index.html`
    #[error("No index.html found in build or public directory")]
    IndexNotFound,

    #[error("Error reading HTML file: {0}")]
    IndexRead(#[source] std::io::Error),

    /// Request could not be forwarded or the target did not answer
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Invalid proxy request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::IndexNotFound => (
                StatusCode::NOT_FOUND,
                "No index.html found in build or public directory",
            )
                .into_response(),
            AppError::IndexRead(e) => {
                error!(error = %e, "Failed to read index.html");
                (StatusCode::INTERNAL_SERVER_ERROR, "Error reading HTML file").into_response()
            }
            AppError::Upstream(message) => {
                error!(%message, "Proxy upstream failure");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({"error": "Proxy error", "details": message})),
                )
                    .into_response()
            }
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": message})),
            )
                .into_response(),
        }
    }
}
