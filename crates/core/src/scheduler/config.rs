//! Scheduler configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the job scheduler and the per-job pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How often to look for waiting jobs (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum jobs running at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,

    /// Minimum time between progress updates of one job (milliseconds).
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,

    /// Minimum time between user messages of one job (milliseconds).
    #[serde(default = "default_message_interval")]
    pub message_interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    10_000 // 10 seconds
}

fn default_max_concurrent() -> usize {
    1
}

fn default_progress_interval() -> u64 {
    3_000
}

fn default_message_interval() -> u64 {
    10_000
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn message_interval(&self) -> Duration {
        Duration::from_millis(self.message_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_concurrent_jobs: default_max_concurrent(),
            progress_interval_ms: default_progress_interval(),
            message_interval_ms: default_message_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.max_concurrent_jobs, 1);
        assert_eq!(config.progress_interval_ms, 3_000);
        assert_eq!(config.message_interval_ms, 10_000);
    }

    #[test]
    fn test_deserialize_minimal() {
        let toml = r#"
            max_concurrent_jobs = 2
        "#;
        let config: SchedulerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_concurrent_jobs, 2);
        assert_eq!(config.poll_interval_ms, 10_000);
    }
}
