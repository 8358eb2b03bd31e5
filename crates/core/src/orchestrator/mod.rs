//! Per-job pipeline: render, pin, assemble, finalize.
//!
//! One [`PipelineOrchestrator::run`] call drives a single job from its
//! record to a terminal outcome. Every terminal path deletes the job record.

mod pipeline;
mod progress;
mod types;

pub use pipeline::PipelineOrchestrator;
pub use progress::{ProgressTracker, Throttle};
pub use types::{JobOutcome, OrchestratorError};
