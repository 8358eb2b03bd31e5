use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Pinning API URL is set and credentials come in pairs
/// - Batch, gateway, scheduler and renderer limits are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    // Pinning validation
    let pinning = &config.pinning;
    if pinning.api_url.trim().is_empty() {
        return Err(invalid("pinning.api_url cannot be empty"));
    }
    if pinning.api_key.is_empty() != pinning.api_secret.is_empty() {
        return Err(invalid(
            "pinning.api_key and pinning.api_secret must be set together",
        ));
    }
    non_zero("pinning.max_items_per_batch", pinning.max_items_per_batch)?;
    non_zero("pinning.max_bytes_per_batch", pinning.max_bytes_per_batch)?;
    non_zero("pinning.max_attempts", pinning.max_attempts as usize)?;

    // Gateway validation
    let gateway = &config.gateway;
    if gateway.url.trim().is_empty() {
        return Err(invalid("gateway.url cannot be empty"));
    }
    non_zero(
        "gateway.max_addresses_per_request",
        gateway.max_addresses_per_request,
    )?;
    non_zero(
        "gateway.max_concurrent_requests",
        gateway.max_concurrent_requests,
    )?;
    non_zero("gateway.max_attempts", gateway.max_attempts as usize)?;

    // Scheduler validation
    non_zero(
        "scheduler.max_concurrent_jobs",
        config.scheduler.max_concurrent_jobs,
    )?;
    non_zero(
        "scheduler.poll_interval_ms",
        config.scheduler.poll_interval_ms as usize,
    )?;

    // Renderer validation
    if config.renderer.command.as_os_str().is_empty() {
        return Err(invalid("renderer.command cannot be empty"));
    }
    non_zero(
        "renderer.max_parallel_frames",
        config.renderer.max_parallel_frames,
    )?;

    Ok(())
}

fn non_zero(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(invalid(&format!("{} cannot be 0", field)));
    }
    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::net::IpAddr;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let config = Config {
            server: ServerConfig {
                host: "0.0.0.0".parse::<IpAddr>().unwrap(),
                port: 0,
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_key_without_secret_fails() {
        let mut config = Config::default();
        config.pinning.api_key = "key".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("api_secret"));

        config.pinning.api_secret = "secret".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_api_url_fails() {
        let mut config = Config::default();
        config.pinning.api_url = " ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_limits_fail() {
        let mut config = Config::default();
        config.pinning.max_items_per_batch = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_items_per_batch"));

        let mut config = Config::default();
        config.gateway.max_concurrent_requests = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.scheduler.max_concurrent_jobs = 0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.renderer.max_parallel_frames = 0;
        assert!(validate_config(&config).is_err());
    }
}
