use serde::Deserialize;
use std::path::PathBuf;

use crate::core::console::ConsoleFeatures;
use crate::core::voice_bot::VoiceBotConfig;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present
/// here override environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3006
///
/// site:
///   build_dir: "build"
///   public_dir: "public"
///   public_url: ""
///
/// proxy:
///   target: "https://azure-aws-mysql-dw.tigzig.com"
///   timeout_seconds: 30
///
/// providers:
///   openai_api_key: "sk-..."
///   openai_base_url: "https://api.openai.com/v1"
///   api_key_file: "~/.config/realtime-console/keys.json"
///   local_relay_server_url: "ws://localhost:8081"
///   voice_bot:
///     voice: "alloy"
///
/// tools:
///   weather_api_url: "https://api.open-meteo.com"
///   automation_api_url: "https://flowise2-4vzn.onrender.com"
///   automation_chatflow_id: "1bca2aa1-cadf-4916-9ab4-d4d92d2590bc"
///
/// console:
///   persist_charts: true
///   persist_notes: false
///   settle_delay_ms: 1000
///
/// security:
///   cors_allowed_origins: "*"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub site: Option<SiteYaml>,
    pub proxy: Option<ProxyYaml>,
    pub providers: Option<ProvidersYaml>,
    pub tools: Option<ToolsYaml>,
    pub console: Option<ConsoleFeatures>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Static site directories from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SiteYaml {
    pub build_dir: Option<String>,
    pub public_dir: Option<String>,
    /// Substituted for `%PUBLIC_URL%` in `index.html`
    pub public_url: Option<String>,
}

/// Reverse proxy from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProxyYaml {
    /// Upstream for `/api`; an empty string disables the proxy
    pub target: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// OpenAI credentials and endpoints from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersYaml {
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub api_key_file: Option<String>,
    pub local_relay_server_url: Option<String>,
    pub voice_bot: Option<VoiceBotConfig>,
}

/// Tool endpoints from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ToolsYaml {
    pub weather_api_url: Option<String>,
    pub automation_api_url: Option<String>,
    pub automation_chatflow_id: Option<String>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::voice_bot::Voice;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  tls:
    enabled: true
    cert_path: "/etc/tls/cert.pem"
    key_path: "/etc/tls/key.pem"

site:
  build_dir: "dist"
  public_dir: "static"
  public_url: "/console"

proxy:
  target: "http://localhost:9000"
  timeout_seconds: 5

providers:
  openai_api_key: "sk-yaml"
  local_relay_server_url: "ws://localhost:8081"
  voice_bot:
    voice: "nova"

tools:
  weather_api_url: "http://weather.local"
  automation_chatflow_id: "flow-1"

console:
  persist_notes: true
  modals: ["events", "api_key"]

security:
  cors_allowed_origins: "*"
  rate_limit_burst_size: 20
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.tls.unwrap().enabled, Some(true));

        let site = config.site.unwrap();
        assert_eq!(site.build_dir.as_deref(), Some("dist"));
        assert_eq!(site.public_url.as_deref(), Some("/console"));

        assert_eq!(config.proxy.unwrap().timeout_seconds, Some(5));

        let providers = config.providers.unwrap();
        assert_eq!(providers.openai_api_key.as_deref(), Some("sk-yaml"));
        assert_eq!(providers.voice_bot.unwrap().voice, Voice::Nova);

        let tools = config.tools.unwrap();
        assert_eq!(tools.automation_chatflow_id.as_deref(), Some("flow-1"));
        assert!(tools.automation_api_url.is_none());

        let console = config.console.unwrap();
        assert!(console.persist_notes);
        assert_eq!(console.modals.len(), 2);

        assert_eq!(config.security.unwrap().rate_limit_burst_size, Some(20));
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.site.is_none());
        assert!(config.console.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "server:\n  host: \"localhost\"\n  port: 3000\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("localhost".to_string())
        );
        assert_eq!(config.server.as_ref().unwrap().port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
