//! Collection repository trait.

use async_trait::async_trait;
use thiserror::Error;

use super::Collection;

/// Errors from collection repositories.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read and write access to collection documents.
#[async_trait]
pub trait CollectionRepository: Send + Sync {
    async fn get(&self, collection_id: &str) -> Result<Option<Collection>, CollectionError>;

    /// Store a collection document, replacing any previous version.
    async fn update(
        &self,
        collection_id: &str,
        collection: &Collection,
    ) -> Result<(), CollectionError>;
}
