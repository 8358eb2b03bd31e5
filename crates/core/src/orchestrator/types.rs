//! Types for the pipeline orchestrator.

use serde::Serialize;
use thiserror::Error;

use crate::collection::CollectionError;
use crate::job::JobStoreError;

/// Errors that abort a job outside its normal failure paths.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Job store error.
    #[error("job store error: {0}")]
    JobStore(#[from] JobStoreError),

    /// Collection repository error.
    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Every frame pinned and the folder stored.
    Completed { folder_hash: String },
    /// The job was cancelled by its owner.
    Cancelled,
    /// Script, render, pin or folder failure.
    Failed { reason: String },
    /// The collection or item no longer exists.
    Missing,
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed { .. } => "failed",
            Self::Missing => "missing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_value(JobOutcome::Completed {
            folder_hash: "bafyfolder".to_string(),
        })
        .unwrap();
        assert_eq!(json["outcome"], "completed");
        assert_eq!(json["folder_hash"], "bafyfolder");

        let json = serde_json::to_value(JobOutcome::Cancelled).unwrap();
        assert_eq!(json["outcome"], "cancelled");
    }

    #[test]
    fn test_error_display() {
        let err = OrchestratorError::JobStore(JobStoreError::Database("locked".to_string()));
        assert_eq!(err.to_string(), "job store error: database error: locked");
    }
}
