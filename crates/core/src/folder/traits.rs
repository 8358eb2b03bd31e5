//! Remote directory-node endpoint trait.

use async_trait::async_trait;

use super::{DirectoryNode, FolderError};

/// A remote API that stores a directory node and returns its content hash.
#[async_trait]
pub trait DagEndpoint: Send + Sync {
    /// Endpoint name for logging.
    fn name(&self) -> &str;

    /// Store and pin the node. Returns the node's content identifier.
    async fn put_directory(&self, node: &DirectoryNode) -> Result<String, FolderError>;
}
