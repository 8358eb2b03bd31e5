//! HTTP client for the multi-address gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{GatewayConfig, GatewayError, GatewayTransport};

/// Fetches many addresses in one GET, each passed as a `cid` query parameter.
pub struct HttpGatewayTransport {
    client: Client,
    base_url: String,
}

impl HttpGatewayTransport {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    fn build_url(&self, addresses: &[String]) -> String {
        let query = addresses
            .iter()
            .map(|address| format!("cid={}", urlencoding::encode(address)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.base_url, query)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::ConnectionFailed(e.to_string())
    } else {
        GatewayError::ApiError(e.to_string())
    }
}

#[async_trait]
impl GatewayTransport for HttpGatewayTransport {
    fn name(&self) -> &str {
        "multi-cid-gateway"
    }

    async fn fetch_many(&self, addresses: &[String]) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .client
            .get(self.build_url(addresses))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        debug!(addresses = addresses.len(), bytes = body.len(), "Gateway response received");

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_repeats_cid_param() {
        let transport = HttpGatewayTransport::new(&GatewayConfig {
            url: "http://localhost:8787/ipfs/".to_string(),
            ..Default::default()
        })
        .unwrap();

        let url = transport.build_url(&["QmA".to_string(), "QmDir/1 2.png".to_string()]);
        assert_eq!(url, "http://localhost:8787/ipfs/?cid=QmA&cid=QmDir%2F1%202.png");
    }
}
