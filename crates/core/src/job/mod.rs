//! Durable job records for rendering jobs.
//!
//! A job is keyed by `<owner>:<collection>:<item>:<timestamp>` and carries a
//! small record: its scheduling state plus the pin results gathered so far.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteJobStore;
pub use store::{JobMutation, JobStore, JobStoreError};
pub use types::{JobKey, JobMetadata, JobRecord, JobState};
