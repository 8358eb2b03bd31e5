//! Job API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use pinforge_core::{JobKey, JobRecord, JobStoreError, SchedulerError, SchedulerStatus};
use tracing::warn;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for queueing a job
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobBody {
    /// Wallet address of the requesting user
    pub user_id: String,
    pub collection_id: String,
    /// Item of the collection to render
    pub nft_id: String,
}

/// Response for job operations
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub key: String,
    pub owner_id: String,
    pub collection_id: String,
    pub item_id: String,
    pub created_at: i64,
    pub state: String,
    /// Frames pinned so far
    pub pinned_count: usize,
}

impl JobResponse {
    fn new(key: &JobKey, record: &JobRecord) -> Self {
        Self {
            key: key.to_string(),
            owner_id: key.owner_id.clone(),
            collection_id: key.collection_id.clone(),
            item_id: key.item_id.clone(),
            created_at: key.created_at,
            state: record.state().as_str().to_string(),
            pinned_count: record.pinnings.len(),
        }
    }
}

/// Response for listing jobs
#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub total: usize,
}

/// Response for cancelling jobs
#[derive(Debug, Serialize)]
pub struct CancelJobsResponse {
    pub cancelled: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<JobErrorResponse>);

fn error_response(err: SchedulerError) -> ApiError {
    let status = match &err {
        SchedulerError::CollectionNotFound(_) | SchedulerError::ItemNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        SchedulerError::JobStore(JobStoreError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
        SchedulerError::JobStore(JobStoreError::AlreadyExists(_)) => StatusCode::CONFLICT,
        _ => {
            warn!(error = %err, "Job request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(JobErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Queue a rendering job
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitJobBody>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let key = state
        .scheduler()
        .submit_job(&body.user_id, &body.collection_id, &body.nft_id)
        .await
        .map_err(error_response)?;

    let record = state
        .jobs()
        .read(&key)
        .map_err(|e| error_response(e.into()))?
        .unwrap_or_default();

    Ok((StatusCode::ACCEPTED, Json(JobResponse::new(&key, &record))))
}

/// List every job record, oldest first
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListJobsResponse>, ApiError> {
    let records = state.jobs().list().map_err(|e| error_response(e.into()))?;

    let jobs: Vec<JobResponse> = records
        .iter()
        .map(|(key, record)| JobResponse::new(key, record))
        .collect();

    Ok(Json(ListJobsResponse {
        total: jobs.len(),
        jobs,
    }))
}

/// Cancel every job of a user in a collection
pub async fn cancel_jobs(
    State(state): State<Arc<AppState>>,
    Path((user_id, collection_id)): Path<(String, String)>,
) -> Result<Json<CancelJobsResponse>, ApiError> {
    let cancelled = state
        .scheduler()
        .cancel_collection(&user_id, &collection_id)
        .await
        .map_err(error_response)?;

    Ok(Json(CancelJobsResponse { cancelled }))
}

/// Scheduler status
pub async fn scheduler_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SchedulerStatus>, ApiError> {
    state.scheduler().status().map(Json).map_err(error_response)
}
