use std::sync::Arc;
use pinforge_core::{Config, JobScheduler, JobStore, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    jobs: Arc<dyn JobStore>,
    scheduler: Arc<JobScheduler>,
}

impl AppState {
    pub fn new(config: Config, jobs: Arc<dyn JobStore>, scheduler: Arc<JobScheduler>) -> Self {
        Self {
            config,
            jobs,
            scheduler,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn jobs(&self) -> &dyn JobStore {
        self.jobs.as_ref()
    }

    pub fn scheduler(&self) -> &JobScheduler {
        self.scheduler.as_ref()
    }
}
