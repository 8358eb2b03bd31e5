//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock collaborators injected, so the API can be exercised without
//! an IPFS node or a renderer.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use pinforge_core::{
    testing::{
        MockCollectionRepository, MockDagEndpoint, MockNotifier, MockPinEndpoint, MockRenderer,
        MockScriptSource,
    },
    BatchLimits, Config, DatabaseConfig, FolderAssembler, JobScheduler, PinBatchQueue,
    PipelineOrchestrator, SchedulerConfig, SqliteJobStore,
};
use pinforge_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use pinforge_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// The scheduler is built but not started, so submitted jobs stay queued
/// unless a test starts it.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/jobs", json!({
///         "userId": "0xabc", "collectionId": "col-1", "nftId": "nft-1"
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub jobs: Arc<SqliteJobStore>,
    pub scheduler: Arc<JobScheduler>,
    /// Mock collection repository - seeded with `col-1`
    pub collections: Arc<MockCollectionRepository>,
    pub notifier: Arc<MockNotifier>,
    pub renderer: Arc<MockRenderer>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with collection `col-1` holding
    /// `nft-1` (3 frames) and `nft-2` (2 frames).
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            scheduler: SchedulerConfig {
                poll_interval_ms: 20,
                ..Default::default()
            },
            ..Default::default()
        };

        let jobs = Arc::new(SqliteJobStore::new(&db_path).expect("Failed to create job store"));
        let collections = Arc::new(
            MockCollectionRepository::with_collection(fixtures::collection(
                "col-1",
                &[("nft-1", 3), ("nft-2", 2)],
            ))
            .await,
        );
        let notifier = Arc::new(MockNotifier::new());
        let renderer = Arc::new(MockRenderer::new());

        let pins = PinBatchQueue::new(
            Arc::new(MockPinEndpoint::new()),
            BatchLimits::from(&config.pinning),
        );
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            jobs.clone(),
            collections.clone(),
            notifier.clone(),
            Arc::new(MockScriptSource::new()),
            renderer.clone(),
            pins,
            FolderAssembler::new(Arc::new(MockDagEndpoint::new()), 2),
            config.scheduler.clone(),
        ));

        let scheduler = Arc::new(JobScheduler::new(
            config.scheduler.clone(),
            jobs.clone(),
            collections.clone(),
            notifier.clone(),
            orchestrator,
        ));

        let state = Arc::new(AppState::new(config, jobs.clone(), scheduler.clone()));
        let router = create_router(state);

        Self {
            router,
            jobs,
            scheduler,
            collections,
            notifier,
            renderer,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
