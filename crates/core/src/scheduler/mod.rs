//! Job scheduler.
//!
//! A single polling loop picks the oldest waiting job whenever fewer than
//! `max_concurrent_jobs` jobs are pending, marks it pending and hands it to
//! the [`PipelineOrchestrator`](crate::orchestrator::PipelineOrchestrator).

mod config;
mod runner;
mod types;

pub use config::SchedulerConfig;
pub use runner::JobScheduler;
pub use types::{SchedulerError, SchedulerStatus};
