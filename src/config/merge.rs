use std::path::PathBuf;

use super::utils::optional;
use super::yaml::YamlConfig;
use super::{ServerConfig, TlsConfig, env};

/// Merge YAML overrides onto the environment-derived configuration.
///
/// Priority: YAML > ENV (including `.env`) > defaults.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = env::load_from_env()?;
    let Some(yaml) = yaml else {
        return Ok(config);
    };

    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(false) => config.tls = None,
                Some(true) => {
                    let cert_path = tls
                        .cert_path
                        .ok_or("server.tls.enabled is true but cert_path is missing")?;
                    let key_path = tls
                        .key_path
                        .ok_or("server.tls.enabled is true but key_path is missing")?;
                    config.tls = Some(TlsConfig {
                        cert_path: PathBuf::from(cert_path),
                        key_path: PathBuf::from(key_path),
                    });
                }
                None => {}
            }
        }
    }

    if let Some(site) = yaml.site {
        if let Some(dir) = site.build_dir {
            config.site.build_dir = PathBuf::from(dir);
        }
        if let Some(dir) = site.public_dir {
            config.site.public_dir = PathBuf::from(dir);
        }
        if let Some(url) = site.public_url {
            config.site.public_url = url;
        }
    }

    if let Some(proxy) = yaml.proxy {
        if let Some(target) = proxy.target {
            config.proxy.target = optional(target);
        }
        if let Some(timeout) = proxy.timeout_seconds {
            config.proxy.timeout_seconds = timeout;
        }
    }

    if let Some(providers) = yaml.providers {
        // The voice bot section replaces the whole block; the base URL
        // below still applies on top of it.
        let base_url = config.voice_bot.base_url.clone();
        if let Some(voice_bot) = providers.voice_bot {
            config.voice_bot = voice_bot;
            config.voice_bot.base_url = base_url;
        }
        if let Some(key) = providers.openai_api_key {
            config.openai_api_key = optional(key);
        }
        if let Some(base) = providers.openai_base_url {
            config.voice_bot.base_url = base;
        }
        if let Some(path) = providers.api_key_file {
            config.api_key_file = optional(path).map(PathBuf::from);
        }
        if let Some(url) = providers.local_relay_server_url {
            config.local_relay_server_url = optional(url);
        }
    }

    if let Some(tools) = yaml.tools {
        if let Some(url) = tools.weather_api_url {
            config.tools.weather_base_url = url;
        }
        if let Some(url) = tools.automation_api_url {
            config.tools.automation_base_url = url;
        }
        if let Some(id) = tools.automation_chatflow_id {
            config.tools.chatflow_id = id;
        }
    }

    if let Some(console) = yaml.console {
        config.console = console;
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = security.cors_allowed_origins {
            config.cors_allowed_origins = optional(origins);
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
    }

    Ok(config)
}
