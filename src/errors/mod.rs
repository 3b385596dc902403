//! HTTP-layer error types.

pub mod app_error;

pub use app_error::{AppError, AppResult};
