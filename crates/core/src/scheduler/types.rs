//! Types for the job scheduler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collection::CollectionError;
use crate::job::JobStoreError;

/// Errors from scheduler operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Job store error.
    #[error("job store error: {0}")]
    JobStore(#[from] JobStoreError),

    /// Collection repository error.
    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),

    /// Submission for a collection that does not exist.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// Submission for an item the collection does not contain.
    #[error("item {item_id} not found in collection {collection_id}")]
    ItemNotFound {
        collection_id: String,
        item_id: String,
    },
}

/// Snapshot of the scheduler and its job records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Whether the polling loop is running.
    pub running: bool,
    /// Jobs with an orchestrator task in this process.
    pub active_jobs: usize,
    pub waiting_count: usize,
    pub pending_count: usize,
    pub canceled_count: usize,
}
