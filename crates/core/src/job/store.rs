//! Job storage trait.

use thiserror::Error;

use super::{JobKey, JobRecord, JobState};

/// Error type for job store operations.
#[derive(Debug, Error)]
pub enum JobStoreError {
    /// Malformed job key.
    #[error("invalid job key: {0}")]
    InvalidKey(String),

    /// A record with this key already exists.
    #[error("job already exists: {0}")]
    AlreadyExists(String),

    /// Record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

/// Closure applied by [`JobStore::mutate`].
///
/// Receives the current record (or a default `Waiting` record when none
/// exists). Returning `None` leaves the store untouched.
pub type JobMutation<'a> = &'a mut dyn FnMut(JobRecord) -> Option<JobRecord>;

/// Trait for job record storage backends.
///
/// `mutate` is the only way to change an existing record. Implementations
/// must serialize concurrent mutations of the same key.
pub trait JobStore: Send + Sync {
    /// Create a record in the given state.
    fn create(&self, key: &JobKey, state: JobState) -> Result<JobRecord, JobStoreError>;

    /// Read a record. `None` means "no metadata yet".
    fn read(&self, key: &JobKey) -> Result<Option<JobRecord>, JobStoreError>;

    /// Apply `f` to the record and persist the result if `f` returns one.
    /// Returns the persisted record.
    fn mutate(&self, key: &JobKey, f: JobMutation<'_>)
        -> Result<Option<JobRecord>, JobStoreError>;

    /// Delete a record. Deleting a missing record is not an error.
    fn delete(&self, key: &JobKey) -> Result<bool, JobStoreError>;

    /// List every record, oldest first.
    fn list(&self) -> Result<Vec<(JobKey, JobRecord)>, JobStoreError>;

    /// List the records of one owner in one collection, oldest first.
    fn list_for_collection(
        &self,
        owner_id: &str,
        collection_id: &str,
    ) -> Result<Vec<(JobKey, JobRecord)>, JobStoreError>;

    /// Put every `Pending` record back to `Waiting`.
    ///
    /// Called once at startup: a record can only be `Pending` for the
    /// process that marked it, so anything found `Pending` belongs to a
    /// previous process and is restarted from scratch.
    fn requeue_pending(&self) -> Result<usize, JobStoreError>;

    /// Current state of a job, if it has a record.
    fn state(&self, key: &JobKey) -> Result<Option<JobState>, JobStoreError> {
        Ok(self.read(key)?.map(|record| record.state()))
    }

    /// Set the state of a job through `mutate`.
    fn set_state(&self, key: &JobKey, state: JobState) -> Result<(), JobStoreError> {
        self.mutate(key, &mut |mut record| {
            record.metadata.state = state;
            Some(record)
        })?;
        Ok(())
    }
}
