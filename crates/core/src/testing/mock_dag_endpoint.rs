//! Mock directory-node endpoint for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::folder::{DagEndpoint, DirectoryNode, FolderError};

/// Mock implementation of the DagEndpoint trait.
///
/// The returned content id is derived from the encoded node, so equal nodes
/// get equal ids.
#[derive(Debug, Default)]
pub struct MockDagEndpoint {
    nodes: Arc<RwLock<Vec<DirectoryNode>>>,
    calls: Arc<RwLock<usize>>,
    fail_next: Arc<RwLock<u32>>,
}

impl MockDagEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes stored successfully.
    pub async fn recorded_nodes(&self) -> Vec<DirectoryNode> {
        self.nodes.read().await.clone()
    }

    /// Every call, failed ones included.
    pub async fn call_count(&self) -> usize {
        *self.calls.read().await
    }

    pub async fn set_fail_next(&self, count: u32) {
        *self.fail_next.write().await = count;
    }
}

#[async_trait]
impl DagEndpoint for MockDagEndpoint {
    fn name(&self) -> &str {
        "mock"
    }

    async fn put_directory(&self, node: &DirectoryNode) -> Result<String, FolderError> {
        *self.calls.write().await += 1;

        {
            let mut fail_next = self.fail_next.write().await;
            if *fail_next > 0 {
                *fail_next -= 1;
                return Err(FolderError::ApiError("mock failure".to_string()));
            }
        }

        let fingerprint = node.fingerprint()?;
        self.nodes.write().await.push(node.clone());
        Ok(format!("bafy{}", &fingerprint[..32]))
    }
}
