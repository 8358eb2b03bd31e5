//! Single-flight pin batch queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::metrics::{PIN_BATCH_ATTEMPTS, PIN_BATCH_FILES, PIN_REQUESTS};

use super::{PinEndpoint, PinError, PinUpload, PinnedFile, PinningConfig};

/// Limits applied to every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_items: usize,
    pub max_bytes: usize,
    pub max_attempts: u32,
}

impl From<&PinningConfig> for BatchLimits {
    fn from(config: &PinningConfig) -> Self {
        Self {
            max_items: config.max_items_per_batch,
            max_bytes: config.max_bytes_per_batch,
            max_attempts: config.max_attempts,
        }
    }
}

/// Pick the next batch from the pending sizes, in arrival order.
///
/// A request is admitted when the batch is still empty or when it fits in
/// the remaining byte budget; packing stops at `max_items`. Requests that do
/// not fit are skipped, not waited on, so a later smaller request can still
/// join. An oversized request always gets a batch of its own once it reaches
/// the front.
pub fn pack_batch(sizes: &[usize], max_items: usize, max_bytes: usize) -> Vec<usize> {
    let mut selected = Vec::new();
    let mut total = 0usize;

    for (idx, &size) in sizes.iter().enumerate() {
        if selected.len() >= max_items.max(1) {
            break;
        }
        if selected.is_empty() || total.saturating_add(size) <= max_bytes {
            selected.push(idx);
            total = total.saturating_add(size);
        }
    }

    selected
}

/// A queued request waiting for its batch.
struct QueuedPin {
    id: String,
    data: Arc<Vec<u8>>,
    respond: oneshot::Sender<Result<PinnedFile, PinError>>,
}

#[derive(Default)]
struct QueueState {
    pending: Vec<QueuedPin>,
    draining: bool,
}

impl QueueState {
    fn take(&mut self, id: &str) -> Option<QueuedPin> {
        let idx = self.pending.iter().position(|pin| pin.id == id)?;
        Some(self.pending.remove(idx))
    }
}

struct Inner {
    endpoint: Arc<dyn PinEndpoint>,
    limits: BatchLimits,
    state: Mutex<QueueState>,
}

/// Queue that turns individual pin requests into bounded batch uploads.
///
/// Cheap to clone; clones share one pending list and one drain worker. At
/// most one batch is in flight at any time.
#[derive(Clone)]
pub struct PinBatchQueue {
    inner: Arc<Inner>,
}

impl PinBatchQueue {
    pub fn new(endpoint: Arc<dyn PinEndpoint>, limits: BatchLimits) -> Self {
        Self {
            inner: Arc::new(Inner {
                endpoint,
                limits,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Queue a payload for pinning.
    ///
    /// Returns immediately; the returned handle resolves once the payload is
    /// pinned or its batch ran out of attempts. Must be called from within a
    /// Tokio runtime.
    pub fn submit(&self, data: Vec<u8>) -> PinHandle {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let (tx, rx) = oneshot::channel();
        let size = data.len();

        let start_worker = {
            let mut state = self.inner.state.lock().unwrap();
            state.pending.push(QueuedPin {
                id: id.clone(),
                data: Arc::new(data),
                respond: tx,
            });
            !std::mem::replace(&mut state.draining, true)
        };

        debug!(id = %id, size, "File enqueued for pinning");

        if start_worker {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.drain().await });
        }

        PinHandle { id, rx }
    }

    /// Number of requests not yet settled.
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().unwrap().pending.len()
    }

    /// Whether the drain worker is currently running.
    pub fn is_draining(&self) -> bool {
        self.inner.state.lock().unwrap().draining
    }
}

impl Inner {
    async fn drain(self: Arc<Self>) {
        loop {
            let batch = {
                let mut state = self.state.lock().unwrap();
                if state.pending.is_empty() {
                    state.draining = false;
                    return;
                }
                let sizes: Vec<usize> = state.pending.iter().map(|pin| pin.data.len()).collect();
                pack_batch(&sizes, self.limits.max_items, self.limits.max_bytes)
                    .into_iter()
                    .map(|idx| PinUpload {
                        name: state.pending[idx].id.clone(),
                        data: Arc::clone(&state.pending[idx].data),
                    })
                    .collect::<Vec<_>>()
            };

            self.submit_batch(batch).await;
        }
    }

    async fn submit_batch(&self, mut batch: Vec<PinUpload>) {
        let total_bytes: usize = batch.iter().map(PinUpload::size).sum();
        info!(
            endpoint = self.endpoint.name(),
            files = batch.len(),
            bytes = total_bytes,
            "Attempting to pin batch"
        );
        PIN_BATCH_FILES.observe(batch.len() as f64);

        let mut last_error = String::new();
        for attempt in 1..=self.limits.max_attempts {
            match self.endpoint.add_batch(&batch).await {
                Ok(pinned) => {
                    let matched = self.settle_matched(&mut batch, pinned);
                    if matched > 0 {
                        PIN_BATCH_ATTEMPTS.with_label_values(&["success"]).inc();
                        if !batch.is_empty() {
                            debug!(
                                matched,
                                unmatched = batch.len(),
                                "Partial batch response, unmatched files stay queued"
                            );
                        }
                        return;
                    }
                    PIN_BATCH_ATTEMPTS.with_label_values(&["empty"]).inc();
                    last_error = "response matched none of the batch".to_string();
                    warn!(
                        attempt,
                        files = batch.len(),
                        "Pin response matched none of the batch"
                    );
                }
                Err(e) => {
                    PIN_BATCH_ATTEMPTS.with_label_values(&["error"]).inc();
                    warn!(attempt, files = batch.len(), error = %e, "Pin attempt failed");
                    last_error = e.to_string();
                }
            }
        }

        self.reject_batch(&batch, last_error);
    }

    /// Settle every batch member named in the response. Returns how many matched.
    fn settle_matched(&self, batch: &mut Vec<PinUpload>, pinned: Vec<PinnedFile>) -> usize {
        let mut state = self.state.lock().unwrap();
        let mut matched = 0;

        for file in pinned {
            if file.hash.is_empty() {
                continue;
            }
            let Some(idx) = batch.iter().position(|upload| upload.name == file.name) else {
                continue;
            };
            batch.remove(idx);

            if let Some(pin) = state.take(&file.name) {
                matched += 1;
                PIN_REQUESTS.with_label_values(&["success"]).inc();
                let _ = pin.respond.send(Ok(file));
            }
        }

        matched
    }

    fn reject_batch(&self, batch: &[PinUpload], last_error: String) {
        warn!(
            files = batch.len(),
            attempts = self.limits.max_attempts,
            error = %last_error,
            "Giving up on pin batch"
        );

        let mut state = self.state.lock().unwrap();
        for upload in batch {
            if let Some(pin) = state.take(&upload.name) {
                PIN_REQUESTS.with_label_values(&["failed"]).inc();
                let _ = pin.respond.send(Err(PinError::Exhausted {
                    attempts: self.limits.max_attempts,
                    last_error: last_error.clone(),
                }));
            }
        }
    }
}

/// Resolves to the outcome of one submitted pin request.
#[derive(Debug)]
pub struct PinHandle {
    id: String,
    rx: oneshot::Receiver<Result<PinnedFile, PinError>>,
}

impl PinHandle {
    /// Correlation id sent to the pinning API as the file name.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for PinHandle {
    type Output = Result<PinnedFile, PinError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(PinError::Dropped)))
    }
}
