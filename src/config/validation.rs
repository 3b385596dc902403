use url::Url;

use super::{ServerConfig, TlsConfig};

/// Validate the merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(ref target) = config.proxy.target {
        validate_url("proxy target", target, &["http", "https"])?;
    }
    validate_url(
        "OpenAI base URL",
        &config.voice_bot.base_url,
        &["http", "https"],
    )?;
    validate_url(
        "weather API URL",
        &config.tools.weather_base_url,
        &["http", "https"],
    )?;
    validate_url(
        "automation API URL",
        &config.tools.automation_base_url,
        &["http", "https"],
    )?;
    if let Some(ref relay) = config.local_relay_server_url {
        validate_url("local relay server URL", relay, &["ws", "wss", "http", "https"])?;
    }
    if config.tools.chatflow_id.trim().is_empty() {
        return Err("Automation chatflow id must not be empty".into());
    }
    if let Some(ref tls) = config.tls {
        validate_tls(tls)?;
    }
    validate_rate_limits(
        config.rate_limit_requests_per_second,
        config.rate_limit_burst_size,
    )?;
    Ok(())
}

/// Check that `value` is an absolute URL with one of `schemes`.
pub(super) fn validate_url(
    name: &str,
    value: &str,
    schemes: &[&str],
) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(value).map_err(|e| format!("Invalid {name} {value:?}: {e}"))?;
    if !schemes.contains(&url.scheme()) {
        return Err(format!(
            "Invalid {name} {value:?}: scheme must be one of {}",
            schemes.join(", ")
        )
        .into());
    }
    if url.host_str().is_none() {
        return Err(format!("Invalid {name} {value:?}: missing host").into());
    }
    Ok(())
}

pub(super) fn validate_tls(tls: &TlsConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !tls.cert_path.exists() {
        return Err(format!(
            "TLS certificate file not found: {}",
            tls.cert_path.display()
        )
        .into());
    }
    if !tls.key_path.exists() {
        return Err(format!("TLS key file not found: {}", tls.key_path.display()).into());
    }
    Ok(())
}

pub(super) fn validate_rate_limits(
    requests_per_second: u32,
    burst_size: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    if requests_per_second == 0 {
        return Err("rate_limit_requests_per_second must be greater than 0".into());
    }
    if burst_size == 0 {
        return Err("rate_limit_burst_size must be greater than 0".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("x", "https://example.com", &["https"]).is_ok());
        assert!(
            validate_url("proxy target", "ftp://example.com", &["http", "https"])
                .unwrap_err()
                .to_string()
                .contains("scheme")
        );
        assert!(validate_url("x", "example.com", &["https"]).is_err());
    }

    #[test]
    fn test_relay_accepts_websocket_scheme() {
        let mut config = ServerConfig::default();
        config.local_relay_server_url = Some("ws://localhost:8081".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_tls_missing_files() {
        let temp_dir = TempDir::new().unwrap();
        let cert = temp_dir.path().join("cert.pem");
        std::fs::write(&cert, "cert").unwrap();

        let tls = TlsConfig {
            cert_path: cert,
            key_path: PathBuf::from("/nonexistent/key.pem"),
        };
        assert!(
            validate_tls(&tls)
                .unwrap_err()
                .to_string()
                .contains("TLS key file not found")
        );
    }

    #[test]
    fn test_rate_limits_must_be_positive() {
        assert!(validate_rate_limits(60, 10).is_ok());
        assert!(validate_rate_limits(0, 10).is_err());
        assert!(validate_rate_limits(60, 0).is_err());
    }

    #[test]
    fn test_empty_chatflow_rejected() {
        let mut config = ServerConfig::default();
        config.tools.chatflow_id = " ".to_string();
        assert!(validate(&config).is_err());
    }
}
