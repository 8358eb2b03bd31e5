//! The per-job pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::collection::{Collection, CollectionRepository, NftStatus, PinInfo};
use crate::folder::{DirectoryLink, FolderAssembler};
use crate::job::{JobKey, JobState, JobStore};
use crate::metrics::{JOBS_FINISHED, JOB_DURATION};
use crate::notify::{Notifier, PinningState};
use crate::pinning::{PinBatchQueue, PinnedFile};
use crate::renderer::{RenderError, Renderer, ScriptSource};
use crate::scheduler::SchedulerConfig;

use super::{JobOutcome, OrchestratorError, ProgressTracker};

/// Frames buffered between the renderer and the pipeline.
const FRAME_BUFFER: usize = 32;

const MSG_FAILED: &str = "Something went wrong while processing collection";
const MSG_STOPPED: &str = "NFT rendering stopped";

/// Result of the render-and-pin stage.
enum RenderStage {
    /// Every frame pinned, keyed by file name.
    Pinned(BTreeMap<String, PinnedFile>),
    Cancelled,
    RenderFailed(String),
    PinFailed(String),
}

/// Drives one job through rendering, pinning and folder assembly.
pub struct PipelineOrchestrator {
    jobs: Arc<dyn JobStore>,
    collections: Arc<dyn CollectionRepository>,
    notifier: Arc<dyn Notifier>,
    scripts: Arc<dyn ScriptSource>,
    renderer: Arc<dyn Renderer>,
    pins: PinBatchQueue,
    folders: FolderAssembler,
    config: SchedulerConfig,
}

impl PipelineOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<dyn JobStore>,
        collections: Arc<dyn CollectionRepository>,
        notifier: Arc<dyn Notifier>,
        scripts: Arc<dyn ScriptSource>,
        renderer: Arc<dyn Renderer>,
        pins: PinBatchQueue,
        folders: FolderAssembler,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            jobs,
            collections,
            notifier,
            scripts,
            renderer,
            pins,
            folders,
            config,
        }
    }

    /// Run a job to completion.
    ///
    /// Expected failures end in [`JobOutcome::Failed`]. An `Err` means the
    /// job store or collection repository failed; the record is still
    /// deleted on a best-effort basis.
    pub async fn run(&self, key: &JobKey) -> Result<JobOutcome, OrchestratorError> {
        let started = Instant::now();
        info!(job = %key, "Processing job");

        let result = self.process(key).await;

        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "error",
        };
        JOBS_FINISHED.with_label_values(&[label]).inc();
        JOB_DURATION
            .with_label_values(&[label])
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) => info!(job = %key, outcome = label, ?outcome, "Job finished"),
            Err(e) => {
                error!(job = %key, error = %e, "Job aborted");
                self.notifier
                    .set_pinning_state(&key.collection_id, PinningState::Failed)
                    .await;
                if let Err(e) = self.jobs.delete(key) {
                    warn!(job = %key, error = %e, "Failed to delete job record");
                }
            }
        }

        result
    }

    async fn process(&self, key: &JobKey) -> Result<JobOutcome, OrchestratorError> {
        let Some(collection) = self.collections.get(&key.collection_id).await? else {
            warn!(job = %key, "Collection not found, dropping job");
            self.jobs.delete(key)?;
            return Ok(JobOutcome::Missing);
        };

        let Some(item) = collection.item(&key.item_id).cloned() else {
            warn!(job = %key, "Item not found in collection, dropping job");
            self.report_failure(key, &collection).await;
            self.jobs.delete(key)?;
            return Ok(JobOutcome::Missing);
        };

        self.notifier
            .set_pinning_state(&collection.id, PinningState::Pending)
            .await;

        let script = match self.scripts.fetch_script(&item.script).await {
            Ok(script) => script,
            Err(e) => {
                warn!(job = %key, error = %e, "Could not fetch script");
                self.report_failure(key, &collection).await;
                self.jobs.delete(key)?;
                return Ok(JobOutcome::Failed {
                    reason: e.to_string(),
                });
            }
        };

        let pinned = match self
            .render_and_pin(key, &collection, script, item.total_supply)
            .await?
        {
            RenderStage::Pinned(pinned) => pinned,
            RenderStage::Cancelled => {
                info!(job = %key, "Job cancelled");
                self.jobs.delete(key)?;
                self.notify(key, &collection, MSG_STOPPED).await;
                return Ok(JobOutcome::Cancelled);
            }
            RenderStage::RenderFailed(reason) => {
                warn!(job = %key, reason = %reason, "Rendering failed");
                self.report_failure(key, &collection).await;
                self.jobs.delete(key)?;
                self.notify(key, &collection, MSG_STOPPED).await;
                return Ok(JobOutcome::Failed { reason });
            }
            RenderStage::PinFailed(reason) => {
                warn!(job = %key, reason = %reason, "Pinning failed");
                self.report_failure(key, &collection).await;
                self.jobs.delete(key)?;
                return Ok(JobOutcome::Failed { reason });
            }
        };

        self.jobs.mutate(key, &mut |mut record| {
            if record.state() == JobState::Canceled {
                return None;
            }
            record.pinnings = pinned.clone();
            Some(record)
        })?;

        let links = pinned
            .iter()
            .map(|(name, file)| DirectoryLink::new(name.clone(), file.hash.clone(), file.size))
            .collect();

        let folder_hash = match self.folders.assemble(links).await {
            Ok(hash) => hash,
            Err(e) => {
                warn!(job = %key, error = %e, "Folder assembly failed");
                self.report_failure(key, &collection).await;
                self.jobs.delete(key)?;
                return Ok(JobOutcome::Failed {
                    reason: e.to_string(),
                });
            }
        };

        self.finalize(key, &folder_hash, item.total_supply).await
    }

    /// Render every frame and pin it as soon as it arrives.
    async fn render_and_pin(
        &self,
        key: &JobKey,
        collection: &Collection,
        script: String,
        total: usize,
    ) -> Result<RenderStage, OrchestratorError> {
        let cancel = CancellationToken::new();
        // Stops the renderer on every exit path, early returns included.
        let _stop_renderer = cancel.clone().drop_guard();

        let (tx, mut rx) = mpsc::channel(FRAME_BUFFER);
        let renderer = Arc::clone(&self.renderer);
        let render_cancel = cancel.clone();
        let render_task =
            tokio::spawn(async move { renderer.render(script, total, tx, render_cancel).await });

        let mut tracker = ProgressTracker::new(
            total,
            self.config.progress_interval(),
            self.config.message_interval(),
        );
        let mut pins = FuturesUnordered::new();
        let mut pinned = BTreeMap::new();
        let mut pin_failure = None;
        let mut cancelled = false;
        let mut receiving = true;

        while receiving {
            tokio::select! {
                frame = rx.recv() => match frame {
                    Some(frame) => {
                        let name = format!("{}.png", frame.index + 1);
                        let size = frame.data.len() as u64;
                        let handle = self.pins.submit(frame.data);
                        debug!(job = %key, file = %name, pin = handle.id(), "Frame queued for pinning");
                        pins.push(async move { (name, size, handle.await) });

                        if self.is_cancelled(key)? {
                            info!(job = %key, "Cancellation observed, stopping renderer");
                            cancel.cancel();
                            cancelled = true;
                            receiving = false;
                        }
                    }
                    None => receiving = false,
                },
                Some((name, size, result)) = pins.next(), if !pins.is_empty() => {
                    match result {
                        Ok(file) => {
                            pinned.insert(name.clone(), PinnedFile { name, hash: file.hash, size });
                            self.report_progress(key, collection, &mut tracker).await;
                        }
                        Err(e) => {
                            pin_failure = Some(format!("{}: {}", name, e));
                            cancel.cancel();
                            receiving = false;
                        }
                    }
                }
            }
        }

        drop(rx);
        let render_result = match render_task.await {
            Ok(result) => result,
            Err(e) => Err(RenderError::Spawn(format!("render task failed: {}", e))),
        };

        if cancelled {
            return Ok(RenderStage::Cancelled);
        }
        if let Some(reason) = pin_failure {
            return Ok(RenderStage::PinFailed(reason));
        }
        if let Err(e) = render_result {
            return Ok(RenderStage::RenderFailed(e.to_string()));
        }

        info!(
            job = %key,
            outstanding = pins.len(),
            "Rendering finished, waiting for pins"
        );
        while let Some((name, size, result)) = pins.next().await {
            match result {
                Ok(file) => {
                    pinned.insert(name.clone(), PinnedFile { name, hash: file.hash, size });
                    self.report_progress(key, collection, &mut tracker).await;
                }
                Err(e) => return Ok(RenderStage::PinFailed(format!("{}: {}", name, e))),
            }
        }

        if self.is_cancelled(key)? {
            return Ok(RenderStage::Cancelled);
        }

        Ok(RenderStage::Pinned(pinned))
    }

    /// Record the folder on the collection item and close the job.
    async fn finalize(
        &self,
        key: &JobKey,
        folder_hash: &str,
        total: usize,
    ) -> Result<JobOutcome, OrchestratorError> {
        let Some(mut collection) = self.collections.get(&key.collection_id).await? else {
            warn!(job = %key, "Collection disappeared before it could be updated");
            self.notifier
                .set_pinning_state(&key.collection_id, PinningState::Failed)
                .await;
            self.jobs.delete(key)?;
            return Ok(JobOutcome::Missing);
        };

        match collection.item_mut(&key.item_id) {
            Some(item) => {
                item.status = NftStatus::Saved;
                item.ipfs = Some(PinInfo {
                    ipfs_hash: folder_hash.to_string(),
                    pin_size: 0,
                    timestamp: Utc::now().timestamp_millis().to_string(),
                });
            }
            None => {
                warn!(job = %key, "Item disappeared before it could be updated");
                self.report_failure(key, &collection).await;
                self.jobs.delete(key)?;
                return Ok(JobOutcome::Missing);
            }
        }
        self.collections.update(&key.collection_id, &collection).await?;
        info!(job = %key, folder = %folder_hash, "Updated collection");

        let message = format!("Rendered all {} {}s", total, collection.display_symbol());
        self.notify(key, &collection, &message).await;
        self.notifier
            .set_pinning_state(&collection.id, PinningState::Done)
            .await;
        self.jobs.delete(key)?;

        Ok(JobOutcome::Completed {
            folder_hash: folder_hash.to_string(),
        })
    }

    /// A missing record counts as cancelled.
    fn is_cancelled(&self, key: &JobKey) -> Result<bool, OrchestratorError> {
        Ok(matches!(
            self.jobs.state(key)?,
            Some(JobState::Canceled) | None
        ))
    }

    async fn report_progress(
        &self,
        key: &JobKey,
        collection: &Collection,
        tracker: &mut ProgressTracker,
    ) {
        tracker.record_done();

        if tracker.progress_due() {
            self.notifier
                .set_progress(&collection.id, tracker.snapshot())
                .await;
        }

        if tracker.message_due() {
            let message = format!(
                "Rendered {} out of {} {}s",
                tracker.done(),
                tracker.total(),
                collection.display_symbol()
            );
            self.notify(key, collection, &message).await;
        }
    }

    async fn report_failure(&self, key: &JobKey, collection: &Collection) {
        self.notify(key, collection, MSG_FAILED).await;
        self.notifier
            .set_pinning_state(&collection.id, PinningState::Failed)
            .await;
    }

    async fn notify(&self, key: &JobKey, collection: &Collection, message: &str) {
        self.notifier
            .notify_user(&key.owner_id, &collection.id, &collection.network, message)
            .await;
    }
}
