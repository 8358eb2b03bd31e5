//! Script download.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::gateway::GatewayFetchBatcher;

use super::{RenderError, RendererConfig, ScriptSource};

const IPFS_SCHEME: &str = "ipfs://";

/// Fetches scripts over HTTP(S). `ipfs://` locations go through the gateway
/// batcher when one is configured.
pub struct HttpScriptSource {
    client: Client,
    gateway: Option<GatewayFetchBatcher>,
}

impl HttpScriptSource {
    pub fn new(config: &RendererConfig) -> Result<Self, RenderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.script_timeout_secs))
            .build()
            .map_err(|e| RenderError::ScriptUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            gateway: None,
        })
    }

    pub fn with_gateway(mut self, gateway: GatewayFetchBatcher) -> Self {
        self.gateway = Some(gateway);
        self
    }

    async fn fetch_http(&self, url: &str) -> Result<String, RenderError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RenderError::ScriptUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::ScriptUnavailable(format!("HTTP {status} from {url}")));
        }

        response
            .text()
            .await
            .map_err(|e| RenderError::ScriptUnavailable(e.to_string()))
    }
}

#[async_trait]
impl ScriptSource for HttpScriptSource {
    async fn fetch_script(&self, location: &str) -> Result<String, RenderError> {
        let Some(address) = location.strip_prefix(IPFS_SCHEME) else {
            debug!(url = %location, "Fetching script");
            return self.fetch_http(location).await;
        };

        let gateway = self.gateway.as_ref().ok_or_else(|| {
            RenderError::ScriptUnavailable(format!("no gateway configured for {location}"))
        })?;

        debug!(address = %address, "Fetching script from gateway");
        let bytes = gateway
            .fetch(address)
            .await
            .map_err(|e| RenderError::ScriptUnavailable(e.to_string()))?;

        String::from_utf8(bytes)
            .map_err(|_| RenderError::ScriptUnavailable(format!("{location} is not valid UTF-8")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayConfig;
    use crate::testing::MockGatewayTransport;
    use std::sync::Arc;

    fn gateway_config() -> GatewayConfig {
        GatewayConfig {
            collect_window_ms: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ipfs_location_uses_gateway() {
        let transport = Arc::new(MockGatewayTransport::new());
        transport
            .insert("QmScript/sketch.js", b"function draw() {}".to_vec())
            .await;
        let gateway = GatewayFetchBatcher::new(transport.clone(), &gateway_config());
        let source = HttpScriptSource::new(&RendererConfig::default())
            .unwrap()
            .with_gateway(gateway);

        let script = source.fetch_script("ipfs://QmScript/sketch.js").await.unwrap();
        assert_eq!(script, "function draw() {}");
        assert_eq!(transport.recorded_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ipfs_location_without_gateway_fails() {
        let source = HttpScriptSource::new(&RendererConfig::default()).unwrap();
        let err = source.fetch_script("ipfs://QmScript").await.unwrap_err();
        assert!(matches!(err, RenderError::ScriptUnavailable(_)));
    }

    #[tokio::test]
    async fn test_missing_ipfs_script() {
        let transport = Arc::new(MockGatewayTransport::new());
        let gateway = GatewayFetchBatcher::new(transport, &gateway_config());
        let source = HttpScriptSource::new(&RendererConfig::default())
            .unwrap()
            .with_gateway(gateway);

        let err = source.fetch_script("ipfs://QmNothing").await.unwrap_err();
        assert!(err.to_string().contains("QmNothing"));
    }
}
