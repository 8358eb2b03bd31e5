//! SQLite-backed collection repository.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{Collection, CollectionError, CollectionRepository};

/// Stores each collection as one JSON document.
pub struct SqliteCollectionRepository {
    conn: Mutex<Connection>,
}

impl SqliteCollectionRepository {
    pub fn new(path: &Path) -> Result<Self, CollectionError> {
        let conn =
            Connection::open(path).map_err(|e| CollectionError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory repository (useful for testing).
    pub fn in_memory() -> Result<Self, CollectionError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CollectionError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CollectionError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| CollectionError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl CollectionRepository for SqliteCollectionRepository {
    async fn get(&self, collection_id: &str) -> Result<Option<Collection>, CollectionError> {
        let conn = self.conn.lock().unwrap();

        let json: Option<String> = conn
            .query_row(
                "SELECT document FROM collections WHERE id = ?",
                params![collection_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CollectionError::Database(e.to_string()))?;

        json.map(|json| {
            serde_json::from_str(&json).map_err(|e| CollectionError::Serialization(e.to_string()))
        })
        .transpose()
    }

    async fn update(
        &self,
        collection_id: &str,
        collection: &Collection,
    ) -> Result<(), CollectionError> {
        let json = serde_json::to_string(collection)
            .map_err(|e| CollectionError::Serialization(e.to_string()))?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO collections (id, document, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET document = excluded.document, updated_at = excluded.updated_at
            "#,
            params![collection_id, json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| CollectionError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{NftConfig, NftStatus};

    fn sample() -> Collection {
        Collection {
            id: "col-1".to_string(),
            network: "mainnet".to_string(),
            symbol: Some("GEN".to_string()),
            nfts: vec![NftConfig {
                id: "nft-1".to_string(),
                status: NftStatus::Unfinished,
                total_supply: 4,
                script: "https://example.com/sketch.js".to_string(),
                ipfs: None,
            }],
        }
    }

    #[tokio::test]
    async fn test_get_missing() {
        let repo = SqliteCollectionRepository::in_memory().unwrap();
        assert!(repo.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_then_get() {
        let repo = SqliteCollectionRepository::in_memory().unwrap();
        let collection = sample();

        repo.update("col-1", &collection).await.unwrap();
        assert_eq!(repo.get("col-1").await.unwrap(), Some(collection));
    }

    #[tokio::test]
    async fn test_update_replaces_document() {
        let repo = SqliteCollectionRepository::in_memory().unwrap();
        let mut collection = sample();
        repo.update("col-1", &collection).await.unwrap();

        collection.nfts[0].status = NftStatus::Saved;
        repo.update("col-1", &collection).await.unwrap();

        let stored = repo.get("col-1").await.unwrap().unwrap();
        assert_eq!(stored.nfts[0].status, NftStatus::Saved);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collections.db");

        {
            let repo = SqliteCollectionRepository::new(&path).unwrap();
            repo.update("col-1", &sample()).await.unwrap();
        }

        let repo = SqliteCollectionRepository::new(&path).unwrap();
        assert!(repo.get("col-1").await.unwrap().is_some());
    }
}
