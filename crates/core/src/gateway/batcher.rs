//! Coalescing gateway fetch batcher.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::metrics::{GATEWAY_BLOBS, GATEWAY_REQUESTS};

use super::{parse_frames, GatewayConfig, GatewayError, GatewayTransport};

type FetchResult = Result<Vec<u8>, GatewayError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchStatus {
    /// Waiting for the next wave.
    Pending,
    /// Part of a request that is currently in flight.
    InFlight,
}

struct FetchRequest {
    address: String,
    status: FetchStatus,
    respond: oneshot::Sender<FetchResult>,
}

#[derive(Default)]
struct BatcherState {
    requests: Vec<FetchRequest>,
    running: bool,
}

impl BatcherState {
    /// Remove and return every request matching `pred`. Settled requests
    /// leave the list, so a request is answered at most once.
    fn take_where(&mut self, pred: impl Fn(&FetchRequest) -> bool) -> Vec<FetchRequest> {
        let mut taken = Vec::new();
        let mut i = 0;
        while i < self.requests.len() {
            if pred(&self.requests[i]) {
                taken.push(self.requests.remove(i));
            } else {
                i += 1;
            }
        }
        taken
    }
}

struct Inner {
    transport: Arc<dyn GatewayTransport>,
    chunk_size: usize,
    concurrency: usize,
    max_attempts: u32,
    collect_window: Duration,
    state: Mutex<BatcherState>,
}

/// Batches single-address fetches into multi-address gateway requests.
///
/// Requests for the same address share one download. Each wave takes every
/// pending request, splits the unique addresses into chunks and fetches up
/// to `max_concurrent_requests` chunks at once. Requests whose address is
/// missing from the response fail with [`GatewayError::NotFound`].
#[derive(Clone)]
pub struct GatewayFetchBatcher {
    inner: Arc<Inner>,
}

impl GatewayFetchBatcher {
    pub fn new(transport: Arc<dyn GatewayTransport>, config: &GatewayConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                chunk_size: config.max_addresses_per_request.max(1),
                concurrency: config.max_concurrent_requests.max(1),
                max_attempts: config.max_attempts.max(1),
                collect_window: config.collect_window(),
                state: Mutex::new(BatcherState::default()),
            }),
        }
    }

    /// Request the blob stored at `address`.
    ///
    /// Must be called from within a Tokio runtime. The first request of an
    /// idle batcher starts a worker that waits a short collection window
    /// before the first wave so that concurrent callers share it.
    pub fn fetch(&self, address: impl Into<String>) -> FetchHandle {
        let address = address.into();
        let (tx, rx) = oneshot::channel();

        let start_worker = {
            let mut state = self.inner.state.lock().unwrap();
            state.requests.push(FetchRequest {
                address: address.clone(),
                status: FetchStatus::Pending,
                respond: tx,
            });
            !std::mem::replace(&mut state.running, true)
        };

        debug!(address = %address, "Gateway fetch queued");

        if start_worker {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.run().await });
        }

        FetchHandle { address, rx }
    }

    /// Number of requests not yet settled.
    pub fn pending_len(&self) -> usize {
        self.inner.state.lock().unwrap().requests.len()
    }

    /// Whether the worker is currently running.
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().unwrap().running
    }
}

impl Inner {
    async fn run(self: Arc<Self>) {
        tokio::time::sleep(self.collect_window).await;

        loop {
            let addresses = {
                let mut state = self.state.lock().unwrap();
                let mut seen = HashSet::new();
                let mut addresses = Vec::new();
                for request in state.requests.iter_mut() {
                    if request.status != FetchStatus::Pending {
                        continue;
                    }
                    request.status = FetchStatus::InFlight;
                    if seen.insert(request.address.clone()) {
                        addresses.push(request.address.clone());
                    }
                }
                if addresses.is_empty() {
                    state.running = false;
                    return;
                }
                addresses
            };

            let chunks: Vec<Vec<String>> = addresses
                .chunks(self.chunk_size)
                .map(<[String]>::to_vec)
                .collect();

            info!(
                addresses = addresses.len(),
                requests = chunks.len(),
                "Fetching from gateway"
            );

            futures::stream::iter(chunks)
                .for_each_concurrent(self.concurrency, |chunk| {
                    let this = Arc::clone(&self);
                    async move { this.fetch_chunk(chunk).await }
                })
                .await;

            self.settle_missing();
        }
    }

    async fn fetch_chunk(&self, chunk: Vec<String>) {
        let mut last_error = String::new();
        let mut body = None;

        for attempt in 1..=self.max_attempts {
            match self.transport.fetch_many(&chunk).await {
                Ok(bytes) => {
                    GATEWAY_REQUESTS.with_label_values(&["success"]).inc();
                    body = Some(bytes);
                    break;
                }
                Err(e) => {
                    GATEWAY_REQUESTS.with_label_values(&["error"]).inc();
                    warn!(
                        transport = self.transport.name(),
                        attempt,
                        addresses = chunk.len(),
                        error = %e,
                        "Gateway request failed"
                    );
                    last_error = e.to_string();
                }
            }
        }

        let Some(body) = body else {
            self.reject_chunk(&chunk, last_error);
            return;
        };

        let wanted: HashSet<&str> = chunk.iter().map(String::as_str).collect();
        let frames = parse_frames(&body, |address| wanted.contains(address));
        debug!(
            addresses = chunk.len(),
            frames = frames.len(),
            bytes = body.len(),
            "Gateway response decoded"
        );

        let mut state = self.state.lock().unwrap();
        for frame in frames {
            let waiters = state.take_where(|request| request.address == frame.address);
            if waiters.is_empty() {
                continue;
            }
            let data = &body[frame.range.clone()];
            for request in waiters {
                GATEWAY_BLOBS.with_label_values(&["found"]).inc();
                let _ = request.respond.send(Ok(data.to_vec()));
            }
        }
    }

    /// Fail the in-flight requests of a chunk that ran out of attempts.
    fn reject_chunk(&self, chunk: &[String], last_error: String) {
        warn!(
            addresses = chunk.len(),
            attempts = self.max_attempts,
            error = %last_error,
            "Giving up on gateway request"
        );

        let addresses: HashSet<&str> = chunk.iter().map(String::as_str).collect();
        let mut state = self.state.lock().unwrap();
        let failed = state.take_where(|request| {
            request.status == FetchStatus::InFlight && addresses.contains(request.address.as_str())
        });
        for request in failed {
            GATEWAY_BLOBS.with_label_values(&["failed"]).inc();
            let _ = request.respond.send(Err(GatewayError::Exhausted {
                attempts: self.max_attempts,
                last_error: last_error.clone(),
            }));
        }
    }

    /// Fail every request of the finished wave that no response contained.
    fn settle_missing(&self) {
        let mut state = self.state.lock().unwrap();
        let missing = state.take_where(|request| request.status == FetchStatus::InFlight);
        for request in missing {
            warn!(address = %request.address, "Address missing from gateway response");
            GATEWAY_BLOBS.with_label_values(&["not_found"]).inc();
            let _ = request
                .respond
                .send(Err(GatewayError::NotFound(request.address.clone())));
        }
    }
}

/// Resolves to the blob for one requested address.
#[derive(Debug)]
pub struct FetchHandle {
    address: String,
    rx: oneshot::Receiver<FetchResult>,
}

impl FetchHandle {
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl Future for FetchHandle {
    type Output = FetchResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(GatewayError::Dropped)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGatewayTransport;

    fn config(chunk: usize) -> GatewayConfig {
        GatewayConfig {
            max_addresses_per_request: chunk,
            collect_window_ms: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let transport = Arc::new(MockGatewayTransport::new());
        transport.insert("QmA", b"alpha".to_vec()).await;
        transport.insert("QmB", b"beta".to_vec()).await;
        let batcher = GatewayFetchBatcher::new(transport.clone(), &config(128));

        let a = batcher.fetch("QmA");
        let b = batcher.fetch("QmB");

        assert_eq!(a.await.unwrap(), b"alpha");
        assert_eq!(b.await.unwrap(), b"beta");

        let calls = transport.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["QmA".to_string(), "QmB".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_addresses_are_fetched_once() {
        let transport = Arc::new(MockGatewayTransport::new());
        transport.insert("QmA", b"alpha".to_vec()).await;
        let batcher = GatewayFetchBatcher::new(transport.clone(), &config(128));

        let handles: Vec<_> = (0..3).map(|_| batcher.fetch("QmA")).collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), b"alpha");
        }

        let calls = transport.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 1);
        assert_eq!(batcher.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_missing_address_is_not_found() {
        let transport = Arc::new(MockGatewayTransport::new());
        transport.insert("QmA", b"alpha".to_vec()).await;
        let batcher = GatewayFetchBatcher::new(transport.clone(), &config(128));

        let a = batcher.fetch("QmA");
        let missing = batcher.fetch("QmMissing");

        assert!(a.await.is_ok());
        let err = missing.await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(ref address) if address == "QmMissing"));
    }

    #[tokio::test]
    async fn test_addresses_are_chunked() {
        let transport = Arc::new(MockGatewayTransport::new());
        for i in 0..300 {
            transport.insert(&format!("Qm{i}"), vec![i as u8]).await;
        }
        let batcher = GatewayFetchBatcher::new(transport.clone(), &config(128));

        let handles: Vec<_> = (0..300).map(|i| batcher.fetch(format!("Qm{i}"))).collect();
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), vec![i as u8]);
        }

        let mut sizes: Vec<usize> = transport
            .recorded_calls()
            .await
            .iter()
            .map(Vec::len)
            .collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![44, 128, 128]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let transport = Arc::new(MockGatewayTransport::new());
        transport.set_delay(Duration::from_millis(20)).await;
        for i in 0..10 {
            transport.insert(&format!("Qm{i}"), vec![i as u8]).await;
        }
        let batcher = GatewayFetchBatcher::new(transport.clone(), &config(1));

        let handles: Vec<_> = (0..10).map(|i| batcher.fetch(format!("Qm{i}"))).collect();
        for handle in handles {
            assert!(handle.await.is_ok());
        }

        assert_eq!(transport.recorded_calls().await.len(), 10);
        let peak = transport.max_in_flight().await;
        assert!(peak <= 3, "peak concurrency was {peak}");
        assert!(peak >= 2);
    }

    #[tokio::test]
    async fn test_transient_failures_recover() {
        let transport = Arc::new(MockGatewayTransport::new());
        transport.insert("QmA", b"alpha".to_vec()).await;
        transport.set_fail_next(4).await;
        let batcher = GatewayFetchBatcher::new(transport.clone(), &config(128));

        assert_eq!(batcher.fetch("QmA").await.unwrap(), b"alpha");
        assert_eq!(transport.recorded_calls().await.len(), 5);
    }

    #[tokio::test]
    async fn test_exhausted_chunk_fails_its_requests() {
        let transport = Arc::new(MockGatewayTransport::new());
        transport.insert("QmA", b"alpha".to_vec()).await;
        transport.set_fail_next(5).await;
        let batcher = GatewayFetchBatcher::new(transport.clone(), &config(128));

        let err = batcher.fetch("QmA").await.unwrap_err();
        assert!(matches!(err, GatewayError::Exhausted { attempts: 5, .. }));
        assert_eq!(batcher.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_worker_restarts_after_idle() {
        let transport = Arc::new(MockGatewayTransport::new());
        transport.insert("QmA", b"alpha".to_vec()).await;
        transport.insert("QmB", b"beta".to_vec()).await;
        let batcher = GatewayFetchBatcher::new(transport.clone(), &config(128));

        assert!(batcher.fetch("QmA").await.is_ok());
        tokio::task::yield_now().await;
        assert!(!batcher.is_running());

        assert!(batcher.fetch("QmB").await.is_ok());
        assert_eq!(transport.recorded_calls().await.len(), 2);
    }
}
