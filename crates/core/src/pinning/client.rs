//! IPFS HTTP API pinning client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use tracing::debug;

use super::{parse_pin_response, PinEndpoint, PinError, PinUpload, PinnedFile, PinningConfig};

/// Pins batches through the `add` call of an IPFS HTTP API (Infura-compatible).
pub struct HttpPinEndpoint {
    client: Client,
    config: PinningConfig,
}

impl HttpPinEndpoint {
    /// Create a new endpoint client.
    pub fn new(config: PinningConfig) -> Result<Self, PinError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PinError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    fn add_url(&self) -> String {
        format!(
            "{}/add?recursive=false&pin=true&cid-version=0&wrap-with-directory=false",
            self.base_url()
        )
    }
}

fn map_reqwest_error(e: reqwest::Error) -> PinError {
    if e.is_timeout() {
        PinError::Timeout
    } else if e.is_connect() {
        PinError::ConnectionFailed(e.to_string())
    } else {
        PinError::ApiError(e.to_string())
    }
}

#[async_trait]
impl PinEndpoint for HttpPinEndpoint {
    fn name(&self) -> &str {
        "ipfs-api"
    }

    async fn add_batch(&self, files: &[PinUpload]) -> Result<Vec<PinnedFile>, PinError> {
        let form = files.iter().fold(multipart::Form::new(), |form, file| {
            form.part(
                "file",
                multipart::Part::bytes(file.data.as_ref().clone()).file_name(file.name.clone()),
            )
        });

        let mut request = self.client.post(self.add_url()).multipart(form);
        if !self.config.api_key.is_empty() {
            request = request.basic_auth(&self.config.api_key, Some(&self.config.api_secret));
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response.text().await.map_err(map_reqwest_error)?;
        let pinned = parse_pin_response(&body);
        debug!(requested = files.len(), pinned = pinned.len(), "Pin batch response");

        Ok(pinned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_url_trims_trailing_slash() {
        let endpoint = HttpPinEndpoint::new(PinningConfig {
            api_url: "http://localhost:5001/api/v0/".to_string(),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(
            endpoint.add_url(),
            "http://localhost:5001/api/v0/add?recursive=false&pin=true&cid-version=0&wrap-with-directory=false"
        );
    }
}
