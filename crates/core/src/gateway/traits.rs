//! Gateway transport trait and errors.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from gateway fetches.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Could not reach the gateway.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("request timed out")]
    Timeout,

    /// The gateway answered with an error.
    #[error("gateway error: {0}")]
    ApiError(String),

    /// The response did not contain the requested address.
    #[error("not found in gateway response: {0}")]
    NotFound(String),

    /// Every attempt for the request carrying this address failed.
    #[error("gateway fetch failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    /// The batcher went away before settling the request.
    #[error("fetch request was dropped before completion")]
    Dropped,
}

/// A gateway that returns many blobs in one framed response body.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Transport name for logging.
    fn name(&self) -> &str;

    /// Fetch the raw, framed response body for a set of addresses.
    async fn fetch_many(&self, addresses: &[String]) -> Result<Vec<u8>, GatewayError>;
}
