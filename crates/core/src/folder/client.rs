//! IPFS HTTP API `dag/put` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;

use crate::pinning::PinningConfig;

use super::{DagEndpoint, DirectoryNode, FolderError};

#[derive(Debug, Deserialize)]
struct DagPutResponse {
    #[serde(rename = "Cid")]
    cid: CidLink,
}

#[derive(Debug, Deserialize)]
struct CidLink {
    #[serde(rename = "/")]
    value: String,
}

/// Stores directory nodes as dag-pb (CIDv1, sha2-256) through `dag/put`.
pub struct HttpDagEndpoint {
    client: Client,
    config: PinningConfig,
}

impl HttpDagEndpoint {
    pub fn new(config: PinningConfig) -> Result<Self, FolderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FolderError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn put_url(&self) -> String {
        format!(
            "{}/dag/put?store-codec=dag-pb&input-codec=dag-json&pin=true&hash=sha2-256",
            self.config.api_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl DagEndpoint for HttpDagEndpoint {
    fn name(&self) -> &str {
        "ipfs-api"
    }

    async fn put_directory(&self, node: &DirectoryNode) -> Result<String, FolderError> {
        let form = multipart::Form::new().part("file", multipart::Part::bytes(node.encode()?));

        let mut request = self.client.post(self.put_url()).multipart(form);
        if !self.config.api_key.is_empty() {
            request = request.basic_auth(&self.config.api_key, Some(&self.config.api_secret));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FolderError::Timeout
            } else if e.is_connect() {
                FolderError::ConnectionFailed(e.to_string())
            } else {
                FolderError::ApiError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FolderError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: DagPutResponse = response
            .json()
            .await
            .map_err(|e| FolderError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(parsed.cid.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_url() {
        let endpoint = HttpDagEndpoint::new(PinningConfig {
            api_url: "http://localhost:5001/api/v0".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            endpoint.put_url(),
            "http://localhost:5001/api/v0/dag/put?store-codec=dag-pb&input-codec=dag-json&pin=true&hash=sha2-256"
        );
    }

    #[test]
    fn test_parse_dag_put_response() {
        let parsed: DagPutResponse =
            serde_json::from_str(r#"{"Cid":{"/":"bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"}}"#)
                .unwrap();
        assert_eq!(
            parsed.cid.value,
            "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"
        );
    }
}
