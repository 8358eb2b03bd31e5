//! The scheduler loop.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::collection::CollectionRepository;
use crate::job::{JobKey, JobState, JobStore};
use crate::metrics::{JOBS_RUNNING, JOBS_STARTED};
use crate::notify::{Notifier, PinningState};
use crate::orchestrator::PipelineOrchestrator;

use super::{SchedulerConfig, SchedulerError, SchedulerStatus};

const MSG_QUEUED: &str = "Collection nft is queued for pinning";

/// Polls the job store and starts jobs within the concurrency cap.
pub struct JobScheduler {
    config: SchedulerConfig,
    jobs: Arc<dyn JobStore>,
    collections: Arc<dyn CollectionRepository>,
    notifier: Arc<dyn Notifier>,
    orchestrator: Arc<PipelineOrchestrator>,

    // Runtime state
    running: AtomicBool,
    /// Jobs with a live orchestrator task in this process.
    active: Arc<Mutex<HashSet<JobKey>>>,
    /// (pending, total) at the last poll, for change-only logging.
    last_counts: Mutex<Option<(usize, usize)>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl JobScheduler {
    pub fn new(
        config: SchedulerConfig,
        jobs: Arc<dyn JobStore>,
        collections: Arc<dyn CollectionRepository>,
        notifier: Arc<dyn Notifier>,
        orchestrator: Arc<PipelineOrchestrator>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            jobs,
            collections,
            notifier,
            orchestrator,
            running: AtomicBool::new(false),
            active: Arc::new(Mutex::new(HashSet::new())),
            last_counts: Mutex::new(None),
            shutdown_tx,
        }
    }

    /// Recover jobs left pending by a previous process, then start polling.
    pub fn start(self: &Arc<Self>) -> Result<(), SchedulerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return Ok(());
        }

        info!("Starting job scheduler");

        if let Err(e) = self.recover() {
            self.running.store(false, Ordering::SeqCst);
            return Err(e);
        }

        self.spawn_poll_loop();

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "Job scheduler started"
        );
        Ok(())
    }

    /// Stop polling. Running jobs are left to finish.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }

        info!("Stopping job scheduler");
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Put every pending job back to waiting. Jobs restart from scratch.
    pub fn recover(&self) -> Result<usize, SchedulerError> {
        let requeued = self.jobs.requeue_pending()?;
        if requeued > 0 {
            info!(requeued, "Requeued jobs left pending by a previous run");
        }
        Ok(requeued)
    }

    fn spawn_poll_loop(self: &Arc<Self>) {
        let scheduler = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Scheduler loop started");
            loop {
                if !scheduler.is_running() {
                    break;
                }
                if let Err(e) = scheduler.poll_once() {
                    warn!(error = %e, "Scheduler poll failed");
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scheduler loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(scheduler.config.poll_interval()) => {}
                }
            }
            info!("Scheduler loop stopped");
        });
    }

    /// Run one scheduling pass. Returns the job that was started, if any.
    ///
    /// Cancelled records without a live task are removed. If fewer than
    /// `max_concurrent_jobs` jobs are pending, the oldest waiting job is
    /// marked pending and handed to the orchestrator.
    pub fn poll_once(self: &Arc<Self>) -> Result<Option<JobKey>, SchedulerError> {
        let records = self.jobs.list()?;
        let active = self.active.lock().unwrap().clone();

        let mut pending = 0;
        let mut waiting = Vec::new();
        for (key, record) in records {
            match record.state() {
                JobState::Canceled => {
                    if !active.contains(&key) && self.jobs.delete(&key)? {
                        debug!(job = %key, "Removed cancelled job");
                    }
                }
                JobState::Pending => pending += 1,
                JobState::Waiting => waiting.push(key),
            }
        }

        let total = pending + waiting.len();
        {
            let mut last = self.last_counts.lock().unwrap();
            if *last != Some((pending, total)) {
                info!(pending, total, "Job queue changed");
                *last = Some((pending, total));
            }
        }

        if pending >= self.config.max_concurrent_jobs.max(1) {
            return Ok(None);
        }

        let Some(key) = waiting.into_iter().min_by_key(|key| key.created_at) else {
            return Ok(None);
        };

        let marked = self.jobs.mutate(&key, &mut |mut record| {
            if record.state() != JobState::Waiting {
                return None;
            }
            record.metadata.state = JobState::Pending;
            Some(record)
        })?;
        if marked.is_none() {
            return Ok(None);
        }

        self.active.lock().unwrap().insert(key.clone());
        JOBS_STARTED.inc();
        JOBS_RUNNING.inc();
        info!(job = %key, "Starting job");

        let orchestrator = Arc::clone(&self.orchestrator);
        let jobs = Arc::clone(&self.jobs);
        let active = Arc::clone(&self.active);
        let job = key.clone();
        tokio::spawn(async move {
            let run = tokio::spawn({
                let job = job.clone();
                async move { orchestrator.run(&job).await }
            });

            // The slot must be released however the run ends. A panicked
            // run would stay pending forever, so its record is dropped.
            if let Err(e) = run.await {
                error!(job = %job, error = %e, "Job task panicked");
                if let Err(e) = jobs.delete(&job) {
                    warn!(job = %job, error = %e, "Failed to delete job record");
                }
            }
            active.lock().unwrap().remove(&job);
            JOBS_RUNNING.dec();
        });

        Ok(Some(key))
    }

    /// Queue a job for one item of a collection.
    pub async fn submit_job(
        &self,
        owner_id: &str,
        collection_id: &str,
        item_id: &str,
    ) -> Result<JobKey, SchedulerError> {
        let key = JobKey::try_now(owner_id, collection_id, item_id)?;

        let collection = self
            .collections
            .get(collection_id)
            .await?
            .ok_or_else(|| SchedulerError::CollectionNotFound(collection_id.to_string()))?;

        if collection.item(item_id).is_none() {
            return Err(SchedulerError::ItemNotFound {
                collection_id: collection_id.to_string(),
                item_id: item_id.to_string(),
            });
        }

        self.jobs.create(&key, JobState::Waiting)?;

        self.notifier
            .set_pinning_state(&collection.id, PinningState::Queued)
            .await;
        self.notifier
            .notify_user(&key.owner_id, &collection.id, &collection.network, MSG_QUEUED)
            .await;

        info!(job = %key, "Job queued");
        Ok(key)
    }

    /// Cancel every job of one owner in one collection.
    ///
    /// Running jobs notice at their next frame. Returns how many jobs were marked.
    pub async fn cancel_collection(
        &self,
        owner_id: &str,
        collection_id: &str,
    ) -> Result<usize, SchedulerError> {
        let entries = self.jobs.list_for_collection(owner_id, collection_id)?;
        for (key, _) in &entries {
            self.jobs.set_state(key, JobState::Canceled)?;
        }

        self.notifier
            .set_pinning_state(collection_id, PinningState::Failed)
            .await;

        info!(owner_id, collection_id, count = entries.len(), "Cancelled jobs");
        Ok(entries.len())
    }

    pub fn status(&self) -> Result<SchedulerStatus, SchedulerError> {
        let mut status = SchedulerStatus {
            running: self.is_running(),
            active_jobs: self.active.lock().unwrap().len(),
            ..Default::default()
        };

        for (_, record) in self.jobs.list()? {
            match record.state() {
                JobState::Waiting => status.waiting_count += 1,
                JobState::Pending => status.pending_count += 1,
                JobState::Canceled => status.canceled_count += 1,
            }
        }

        Ok(status)
    }
}
