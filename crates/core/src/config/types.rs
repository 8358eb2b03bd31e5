use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::gateway::GatewayConfig;
use crate::pinning::PinningConfig;
use crate::renderer::RendererConfig;
use crate::scheduler::SchedulerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pinning: PinningConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("pinforge.db")
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pinning: SanitizedPinningConfig,
    pub gateway: GatewayConfig,
    pub scheduler: SchedulerConfig,
    pub renderer: RendererConfig,
}

/// Pinning config with the API credentials hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPinningConfig {
    pub api_url: String,
    pub credentials_configured: bool,
    pub max_items_per_batch: usize,
    pub max_bytes_per_batch: usize,
    pub max_attempts: u32,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let pinning = &config.pinning;
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            pinning: SanitizedPinningConfig {
                api_url: pinning.api_url.clone(),
                credentials_configured: !pinning.api_key.is_empty()
                    && !pinning.api_secret.is_empty(),
                max_items_per_batch: pinning.max_items_per_batch,
                max_bytes_per_batch: pinning.max_bytes_per_batch,
                max_attempts: pinning.max_attempts,
                timeout_secs: pinning.timeout_secs,
            },
            gateway: config.gateway.clone(),
            scheduler: config.scheduler.clone(),
            renderer: config.renderer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "pinforge.db");
        assert_eq!(config.pinning.max_items_per_batch, 250);
        assert_eq!(config.gateway.max_addresses_per_request, 128);
        assert_eq!(config.scheduler.max_concurrent_jobs, 1);
        assert_eq!(config.renderer.max_parallel_frames, 15);
    }

    #[test]
    fn test_deserialize_sections() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
path = "/data/jobs.sqlite"

[pinning]
api_url = "http://localhost:5001/api/v0"
api_key = "key"
api_secret = "secret"

[scheduler]
max_concurrent_jobs = 4

[renderer]
command = "/usr/local/bin/render"
args = ["--png"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(
            config.database.path.to_str().unwrap(),
            "/data/jobs.sqlite"
        );
        assert_eq!(config.pinning.api_url, "http://localhost:5001/api/v0");
        assert_eq!(config.scheduler.max_concurrent_jobs, 4);
        assert_eq!(config.scheduler.poll_interval_ms, 10_000);
        assert_eq!(
            config.renderer.command.to_str().unwrap(),
            "/usr/local/bin/render"
        );
        assert_eq!(config.renderer.args, vec!["--png".to_string()]);
    }

    #[test]
    fn test_sanitized_config_hides_credentials() {
        let mut config = Config::default();
        config.pinning.api_key = "key".to_string();
        config.pinning.api_secret = "very-secret".to_string();

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.pinning.credentials_configured);
        assert_eq!(sanitized.pinning.max_items_per_batch, 250);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("very-secret"));
        assert!(!json.contains("api_key"));
    }

    #[test]
    fn test_sanitized_config_without_credentials() {
        let sanitized = SanitizedConfig::from(&Config::default());
        assert!(!sanitized.pinning.credentials_configured);
        assert_eq!(sanitized.server.port, 8080);
    }
}
