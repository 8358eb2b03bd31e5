//! Mock multi-address gateway for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::gateway::{GatewayError, GatewayTransport, FRAME_END, FRAME_START};

/// Mock implementation of the GatewayTransport trait.
///
/// Answers with a framed body holding every known address of the request,
/// surrounded by some noise. Unknown addresses are left out.
#[derive(Debug, Default)]
pub struct MockGatewayTransport {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    calls: Arc<RwLock<Vec<Vec<String>>>>,
    fail_next: Arc<RwLock<u32>>,
    delay: Arc<RwLock<Option<Duration>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockGatewayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, address: &str, data: Vec<u8>) {
        self.blobs.write().await.insert(address.to_string(), data);
    }

    /// Addresses of every call, failed ones included.
    pub async fn recorded_calls(&self) -> Vec<Vec<String>> {
        self.calls.read().await.clone()
    }

    pub async fn set_fail_next(&self, count: u32) {
        *self.fail_next.write().await = count;
    }

    /// Delay every response.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// Highest number of calls that were in progress at once.
    pub async fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn build_body(&self, addresses: &[String]) -> Vec<u8> {
        let blobs = self.blobs.read().await;
        let mut body = b"<!-- gateway -->\n".to_vec();
        for address in addresses {
            if let Some(data) = blobs.get(address) {
                body.extend_from_slice(FRAME_START);
                body.extend_from_slice(address.as_bytes());
                body.push(b':');
                body.extend_from_slice(data);
                body.extend_from_slice(FRAME_END);
                body.push(b'\n');
            }
        }
        body
    }
}

#[async_trait]
impl GatewayTransport for MockGatewayTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_many(&self, addresses: &[String]) -> Result<Vec<u8>, GatewayError> {
        self.calls.write().await.push(addresses.to_vec());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        {
            let mut fail_next = self.fail_next.write().await;
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(GatewayError::ConnectionFailed("mock failure".to_string()));
            }
        }

        Ok(self.build_body(addresses).await)
    }
}
