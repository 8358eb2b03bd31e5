//! Folder assembler with a fixed attempt budget.

use std::sync::Arc;

use tracing::{info, warn};

use crate::metrics::FOLDER_ASSEMBLIES;

use super::{DagEndpoint, DirectoryLink, DirectoryNode, FolderError};

/// Builds one directory node from a set of links and stores it remotely.
pub struct FolderAssembler {
    endpoint: Arc<dyn DagEndpoint>,
    max_attempts: u32,
}

impl FolderAssembler {
    pub fn new(endpoint: Arc<dyn DagEndpoint>, max_attempts: u32) -> Self {
        Self {
            endpoint,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Assemble and store the folder, retrying without backoff.
    ///
    /// Returns the folder's content hash, or `FolderError::Exhausted` once
    /// every attempt has failed.
    pub async fn assemble(&self, links: Vec<DirectoryLink>) -> Result<String, FolderError> {
        let node = DirectoryNode::new(links);
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.endpoint.put_directory(&node).await {
                Ok(cid) => {
                    FOLDER_ASSEMBLIES.with_label_values(&["success"]).inc();
                    info!(
                        endpoint = self.endpoint.name(),
                        links = node.links().len(),
                        cid = %cid,
                        "Pinned folder"
                    );
                    return Ok(cid);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Attempt to pin folder failed");
                    last_error = e.to_string();
                }
            }
        }

        FOLDER_ASSEMBLIES.with_label_values(&["failed"]).inc();
        Err(FolderError::Exhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDagEndpoint;

    #[tokio::test]
    async fn test_same_links_in_any_order_give_same_hash() {
        let endpoint = Arc::new(MockDagEndpoint::new());
        let assembler = FolderAssembler::new(endpoint.clone(), 5);

        let forward = assembler
            .assemble(vec![
                DirectoryLink::new("2.png", "QmTwo", 20),
                DirectoryLink::new("1.png", "QmOne", 10),
            ])
            .await
            .unwrap();
        let reverse = assembler
            .assemble(vec![
                DirectoryLink::new("1.png", "QmOne", 10),
                DirectoryLink::new("2.png", "QmTwo", 20),
            ])
            .await
            .unwrap();

        assert_eq!(forward, reverse);

        let nodes = endpoint.recorded_nodes().await;
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].links()[0].name, "1.png");
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let endpoint = Arc::new(MockDagEndpoint::new());
        endpoint.set_fail_next(4).await;
        let assembler = FolderAssembler::new(endpoint.clone(), 5);

        let result = assembler
            .assemble(vec![DirectoryLink::new("1.png", "QmOne", 10)])
            .await;
        assert!(result.is_ok());
        assert_eq!(endpoint.call_count().await, 5);
    }

    #[tokio::test]
    async fn test_exhaustion_is_terminal() {
        let endpoint = Arc::new(MockDagEndpoint::new());
        endpoint.set_fail_next(5).await;
        let assembler = FolderAssembler::new(endpoint.clone(), 5);

        let result = assembler
            .assemble(vec![DirectoryLink::new("1.png", "QmOne", 10)])
            .await;
        assert!(matches!(
            result,
            Err(FolderError::Exhausted { attempts: 5, .. })
        ));
        assert_eq!(endpoint.call_count().await, 5);
    }
}
