//! Mock collection repository for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::collection::{Collection, CollectionError, CollectionRepository};

/// In-memory collection repository that records updates.
#[derive(Debug, Default)]
pub struct MockCollectionRepository {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
    updates: Arc<RwLock<Vec<Collection>>>,
}

impl MockCollectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository holding `collection`.
    pub async fn with_collection(collection: Collection) -> Self {
        let repo = Self::new();
        repo.insert(collection).await;
        repo
    }

    pub async fn insert(&self, collection: Collection) {
        self.collections
            .write()
            .await
            .insert(collection.id.clone(), collection);
    }

    pub async fn remove(&self, collection_id: &str) {
        self.collections.write().await.remove(collection_id);
    }

    /// Every document passed to `update`, in order.
    pub async fn updates(&self) -> Vec<Collection> {
        self.updates.read().await.clone()
    }
}

#[async_trait]
impl CollectionRepository for MockCollectionRepository {
    async fn get(&self, collection_id: &str) -> Result<Option<Collection>, CollectionError> {
        Ok(self.collections.read().await.get(collection_id).cloned())
    }

    async fn update(
        &self,
        collection_id: &str,
        collection: &Collection,
    ) -> Result<(), CollectionError> {
        self.updates.write().await.push(collection.clone());
        self.collections
            .write()
            .await
            .insert(collection_id.to_string(), collection.clone());
        Ok(())
    }
}
