//! Configuration module for the realtime console server
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Merging YAML and environment configurations
//! - `validation`: Configuration validation logic
//! - `utils`: Utility functions for configuration parsing
//!
//! # Example
//! ```rust,no_run
//! use realtime_console::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::console::ConsoleFeatures;
use crate::core::credentials::{
    CredentialError, CredentialProvider, FileCredentialStore, StaticCredentials,
};
use crate::core::tools::ToolEndpoints;
use crate::core::voice_bot::VoiceBotConfig;

mod env;
mod merge;
mod utils;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3006;

/// Default upstream for `/api`.
pub const DEFAULT_PROXY_TARGET: &str = "https://azure-aws-mysql-dw.tigzig.com";

/// TLS configuration for HTTPS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Directories the single-page app is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// Production bundle; preferred when it exists
    pub build_dir: PathBuf,
    /// Fallback directory with the unbuilt template
    pub public_dir: PathBuf,
    /// Value substituted for `%PUBLIC_URL%`
    pub public_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from("build"),
            public_dir: PathBuf::from("public"),
            public_url: String::new(),
        }
    }
}

impl SiteConfig {
    /// Directory static assets are served from: build if it exists, else public.
    pub fn root(&self) -> &Path {
        if self.build_dir.is_dir() {
            &self.build_dir
        } else {
            &self.public_dir
        }
    }

    /// Whether the production bundle is missing.
    pub fn serving_public(&self) -> bool {
        !self.build_dir.is_dir()
    }
}

/// Reverse proxy for `/api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Upstream origin; `None` disables the proxy
    pub target: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            target: Some(DEFAULT_PROXY_TARGET.to_string()),
            timeout_seconds: 30,
        }
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the console server, including:
/// - Server settings (host, port, TLS)
/// - Static site and reverse proxy settings
/// - OpenAI credentials and endpoints
/// - Tool endpoints and console feature flags
/// - Security settings (CORS, rate limiting)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    pub site: SiteConfig,
    pub proxy: ProxyConfig,

    // Provider settings
    /// OpenAI API key for the voice bot and direct realtime access
    pub openai_api_key: Option<String>,
    /// Persisted key file used instead of `openai_api_key` when set
    pub api_key_file: Option<PathBuf>,
    /// Relay that holds the key itself; no key is needed when set
    pub local_relay_server_url: Option<String>,
    pub voice_bot: VoiceBotConfig,

    pub tools: ToolEndpoints,
    pub console: ConsoleFeatures,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            tls: None,
            site: SiteConfig::default(),
            proxy: ProxyConfig::default(),
            openai_api_key: None,
            api_key_file: None,
            local_relay_server_url: None,
            voice_bot: VoiceBotConfig::default(),
            tools: ToolEndpoints::default(),
            console: ConsoleFeatures::default(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
        }
    }
}

/// Zeroize secrets when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.openai_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables (and `.env`, already
    /// loaded by `main`) on top of defaults, then validate it.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if the YAML file cannot be read or is malformed, an
    /// environment variable has an invalid format, or validation fails.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    pub fn is_proxy_enabled(&self) -> bool {
        self.proxy.target.is_some()
    }

    /// Credential source for OpenAI calls.
    ///
    /// A configured key file wins; it is seeded with `openai_api_key` when it
    /// holds no key yet.
    pub fn credentials(&self) -> Result<Arc<dyn CredentialProvider>, CredentialError> {
        match self.api_key_file {
            Some(ref path) => {
                let store = FileCredentialStore::open(path)?;
                if store.api_key().is_none() {
                    if let Some(ref key) = self.openai_api_key {
                        store.store(key)?;
                    }
                }
                Ok(Arc::new(store))
            }
            None => Ok(Arc::new(StaticCredentials::new(
                self.openai_api_key.as_deref(),
            ))),
        }
    }
}
