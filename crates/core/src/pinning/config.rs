//! Pinning configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the remote pinning API and the batch queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinningConfig {
    /// Base URL of the IPFS HTTP API (e.g., "https://ipfs.infura.io:5001/api/v0").
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// API key (basic auth user).
    #[serde(default)]
    pub api_key: String,

    /// API secret (basic auth password).
    #[serde(default)]
    pub api_secret: String,

    /// Maximum number of files in one batch upload.
    #[serde(default = "default_max_items")]
    pub max_items_per_batch: usize,

    /// Maximum total payload bytes in one batch upload.
    /// A single file larger than this is still uploaded, alone.
    #[serde(default = "default_max_bytes")]
    pub max_bytes_per_batch: usize,

    /// Attempts per batch (and per folder assembly) before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://ipfs.infura.io:5001/api/v0".to_string()
}

fn default_max_items() -> usize {
    250
}

fn default_max_bytes() -> usize {
    250_000_000
}

fn default_max_attempts() -> u32 {
    5
}

fn default_timeout() -> u64 {
    600
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            api_secret: String::new(),
            max_items_per_batch: default_max_items(),
            max_bytes_per_batch: default_max_bytes(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PinningConfig::default();
        assert_eq!(config.max_items_per_batch, 250);
        assert_eq!(config.max_bytes_per_batch, 250_000_000);
        assert_eq!(config.max_attempts, 5);
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            api_key = "key"
            api_secret = "secret"
            max_items_per_batch = 100
        "#;
        let config: PinningConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.api_key, "key");
        assert_eq!(config.max_items_per_batch, 100);
        assert_eq!(config.max_bytes_per_batch, 250_000_000);
        assert_eq!(config.api_url, "https://ipfs.infura.io:5001/api/v0");
    }
}
