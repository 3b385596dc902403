//! HTTP request handlers
//!
//! - `api` - Health check endpoint
//! - `proxy` - `/api` reverse proxy
//! - `site` - Templated `index.html` for the single-page app

pub mod api;
pub mod proxy;
pub mod site;

// Re-export commonly used handlers for convenient access
pub use proxy::proxy_handler;
pub use site::spa_index;
