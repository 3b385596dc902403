use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::core::credentials::{CredentialProvider, StaticCredentials};

/// Shared state for every HTTP handler.
pub struct AppState {
    pub config: ServerConfig,
    /// Client used to forward `/api` requests; redirects are passed through
    pub proxy_client: reqwest::Client,
    /// Credential source reported by the health check and used by the CLI
    pub credentials: Arc<dyn CredentialProvider>,
}

impl AppState {
    pub async fn new(config: ServerConfig) -> Arc<Self> {
        let proxy_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.proxy.timeout_seconds))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build proxy client, using defaults");
                reqwest::Client::new()
            });

        let credentials = config.credentials().unwrap_or_else(|e| {
            warn!(error = %e, "Key file unavailable, falling back to configured key");
            Arc::new(StaticCredentials::new(config.openai_api_key.as_deref()))
        });

        if config.site.serving_public() {
            info!(
                build_dir = %config.site.build_dir.display(),
                public_dir = %config.site.public_dir.display(),
                "Build directory not found, serving from public directory"
            );
        }
        match config.proxy.target {
            Some(ref target) => info!(%target, "Proxying /api"),
            None => info!("API proxy disabled"),
        }

        Arc::new(Self {
            config,
            proxy_client,
            credentials,
        })
    }
}
