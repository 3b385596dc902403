use std::path::PathBuf;

use super::utils::{env_bool, env_parse, env_var, optional};
use super::{ServerConfig, TlsConfig};

/// Every environment variable the server reads.
pub(super) const ALL_VARS: [&str; 22] = [
    "HOST",
    "PORT",
    "TLS_ENABLED",
    "TLS_CERT_PATH",
    "TLS_KEY_PATH",
    "BUILD_DIR",
    "PUBLIC_DIR",
    "PUBLIC_URL",
    "PROXY_TARGET",
    "PROXY_TIMEOUT_SECONDS",
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "API_KEY_FILE",
    "LOCAL_RELAY_SERVER_URL",
    "WEATHER_API_URL",
    "AUTOMATION_API_URL",
    "AUTOMATION_CHATFLOW_ID",
    "CORS_ALLOWED_ORIGINS",
    "RATE_LIMIT_REQUESTS_PER_SECOND",
    "RATE_LIMIT_BURST_SIZE",
    "PERSIST_NOTES",
    "PERSIST_CHARTS",
];

/// Build a configuration from defaults overridden by environment variables.
pub(super) fn load_from_env() -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = ServerConfig::default();

    if let Some(host) = env_var("HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse::<u16>("PORT")? {
        config.port = port;
    }

    if env_bool("TLS_ENABLED")?.unwrap_or(false) {
        let cert_path = env_var("TLS_CERT_PATH")
            .ok_or("TLS_ENABLED is set but TLS_CERT_PATH is missing")?;
        let key_path =
            env_var("TLS_KEY_PATH").ok_or("TLS_ENABLED is set but TLS_KEY_PATH is missing")?;
        config.tls = Some(TlsConfig {
            cert_path: PathBuf::from(cert_path),
            key_path: PathBuf::from(key_path),
        });
    }

    if let Some(dir) = env_var("BUILD_DIR") {
        config.site.build_dir = PathBuf::from(dir);
    }
    if let Some(dir) = env_var("PUBLIC_DIR") {
        config.site.public_dir = PathBuf::from(dir);
    }
    // PUBLIC_URL may legitimately be empty, so read it raw
    if let Ok(url) = std::env::var("PUBLIC_URL") {
        config.site.public_url = url;
    }

    if let Ok(target) = std::env::var("PROXY_TARGET") {
        config.proxy.target = optional(target);
    }
    if let Some(timeout) = env_parse::<u64>("PROXY_TIMEOUT_SECONDS")? {
        config.proxy.timeout_seconds = timeout;
    }

    config.openai_api_key = env_var("OPENAI_API_KEY");
    if let Some(base) = env_var("OPENAI_BASE_URL") {
        config.voice_bot.base_url = base;
    }
    config.api_key_file = env_var("API_KEY_FILE").map(PathBuf::from);
    config.local_relay_server_url = env_var("LOCAL_RELAY_SERVER_URL");

    if let Some(url) = env_var("WEATHER_API_URL") {
        config.tools.weather_base_url = url;
    }
    if let Some(url) = env_var("AUTOMATION_API_URL") {
        config.tools.automation_base_url = url;
    }
    if let Some(id) = env_var("AUTOMATION_CHATFLOW_ID") {
        config.tools.chatflow_id = id;
    }

    config.cors_allowed_origins = env_var("CORS_ALLOWED_ORIGINS");
    if let Some(rps) = env_parse::<u32>("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = env_parse::<u32>("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }

    if let Some(persist) = env_bool("PERSIST_NOTES")? {
        config.console.persist_notes = persist;
    }
    if let Some(persist) = env_bool("PERSIST_CHARTS")? {
        config.console.persist_charts = persist;
    }

    Ok(config)
}
