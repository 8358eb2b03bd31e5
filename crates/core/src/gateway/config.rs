//! Gateway configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the multi-address gateway and the fetch batcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway URL; one `cid` query parameter is appended per address.
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum addresses per gateway request.
    #[serde(default = "default_chunk_size")]
    pub max_addresses_per_request: usize,

    /// Maximum gateway requests in flight at once.
    #[serde(default = "default_concurrency")]
    pub max_concurrent_requests: usize,

    /// Attempts per gateway request.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// How long the first request waits for others to join its wave (milliseconds).
    #[serde(default = "default_collect_window")]
    pub collect_window_ms: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "https://ipfs-multiple-cids-gateway.juicebox.workers.dev/ipfs/".to_string()
}

fn default_chunk_size() -> usize {
    128
}

fn default_concurrency() -> usize {
    3
}

fn default_max_attempts() -> u32 {
    5
}

fn default_collect_window() -> u64 {
    100
}

fn default_timeout() -> u64 {
    120
}

impl GatewayConfig {
    pub fn collect_window(&self) -> Duration {
        Duration::from_millis(self.collect_window_ms)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_addresses_per_request: default_chunk_size(),
            max_concurrent_requests: default_concurrency(),
            max_attempts: default_max_attempts(),
            collect_window_ms: default_collect_window(),
            timeout_secs: default_timeout(),
        }
    }
}
