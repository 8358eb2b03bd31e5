//! Mock pinning endpoint for testing.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::pinning::{PinEndpoint, PinError, PinUpload, PinnedFile};

/// One recorded `add_batch` call.
#[derive(Debug, Clone)]
pub struct RecordedBatch {
    /// Correlation ids in submission order.
    pub names: Vec<String>,
    pub total_bytes: usize,
}

/// Mock implementation of the PinEndpoint trait.
///
/// Pins every file by default, with a hash derived from its bytes. Can be
/// told to fail, to fail a number of times, or to only acknowledge the
/// first N files of each call.
#[derive(Debug, Default)]
pub struct MockPinEndpoint {
    batches: Arc<RwLock<Vec<RecordedBatch>>>,
    fail_next: Arc<RwLock<u32>>,
    fail_always: Arc<RwLock<bool>>,
    max_matches: Arc<RwLock<Option<usize>>>,
}

impl MockPinEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash the mock assigns to `data`.
    pub fn hash_for(data: &[u8]) -> String {
        let digest = Sha256::digest(data);
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        format!("Qm{}", &hex[..44])
    }

    /// All recorded calls, failed ones included.
    pub async fn recorded_batches(&self) -> Vec<RecordedBatch> {
        self.batches.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.batches.read().await.len()
    }

    /// Fail the next `count` calls with a connection error.
    pub async fn set_fail_next(&self, count: u32) {
        *self.fail_next.write().await = count;
    }

    pub async fn set_fail_always(&self, fail: bool) {
        *self.fail_always.write().await = fail;
    }

    /// Only acknowledge the first `max` files of each call.
    pub async fn set_max_matches_per_call(&self, max: Option<usize>) {
        *self.max_matches.write().await = max;
    }
}

#[async_trait]
impl PinEndpoint for MockPinEndpoint {
    fn name(&self) -> &str {
        "mock"
    }

    async fn add_batch(&self, files: &[PinUpload]) -> Result<Vec<PinnedFile>, PinError> {
        self.batches.write().await.push(RecordedBatch {
            names: files.iter().map(|f| f.name.clone()).collect(),
            total_bytes: files.iter().map(PinUpload::size).sum(),
        });

        if *self.fail_always.read().await {
            return Err(PinError::ConnectionFailed("mock failure".to_string()));
        }
        {
            let mut fail_next = self.fail_next.write().await;
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(PinError::ConnectionFailed("mock failure".to_string()));
            }
        }

        let limit = self.max_matches.read().await.unwrap_or(usize::MAX);
        Ok(files
            .iter()
            .take(limit)
            .map(|file| PinnedFile {
                name: file.name.clone(),
                hash: Self::hash_for(&file.data),
                size: file.size() as u64,
            })
            .collect())
    }
}
