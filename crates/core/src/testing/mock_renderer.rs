//! Mock renderer and script source for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::renderer::{RenderError, RenderedFrame, Renderer, ScriptSource};

/// A recorded `render` call.
#[derive(Debug, Clone)]
pub struct RecordedRender {
    pub script: String,
    pub frame_count: usize,
}

/// Mock implementation of the Renderer trait.
///
/// Emits frames in order with the payload `frame-<index>`, optionally with
/// a delay between frames. Stops at the next frame once cancelled.
#[derive(Debug, Default)]
pub struct MockRenderer {
    calls: Arc<RwLock<Vec<RecordedRender>>>,
    frames_sent: AtomicUsize,
    frame_delay: Arc<RwLock<Option<Duration>>>,
    fail_at: Arc<RwLock<Option<usize>>>,
    hold: Arc<RwLock<bool>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded_renders(&self) -> Vec<RecordedRender> {
        self.calls.read().await.clone()
    }

    /// Frames delivered so far, across all calls.
    pub fn frames_sent(&self) -> usize {
        self.frames_sent.load(Ordering::SeqCst)
    }

    pub async fn set_frame_delay(&self, delay: Duration) {
        *self.frame_delay.write().await = Some(delay);
    }

    /// Fail when frame `index` is reached.
    pub async fn set_fail_at(&self, index: Option<usize>) {
        *self.fail_at.write().await = index;
    }

    /// Produce nothing and wait for cancellation.
    pub async fn set_hold(&self, hold: bool) {
        *self.hold.write().await = hold;
    }
}

#[async_trait]
impl Renderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn render(
        &self,
        script: String,
        frame_count: usize,
        frames: mpsc::Sender<RenderedFrame>,
        cancel: CancellationToken,
    ) -> Result<(), RenderError> {
        self.calls.write().await.push(RecordedRender {
            script,
            frame_count,
        });

        if *self.hold.read().await {
            cancel.cancelled().await;
            return Err(RenderError::Cancelled);
        }

        let delay = *self.frame_delay.read().await;
        let fail_at = *self.fail_at.read().await;

        for index in 0..frame_count {
            if cancel.is_cancelled() {
                return Err(RenderError::Cancelled);
            }
            if fail_at == Some(index) {
                return Err(RenderError::frame_failed(index, "mock failure"));
            }
            if let Some(delay) = delay {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RenderError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let frame = RenderedFrame {
                index,
                data: format!("frame-{}", index).into_bytes(),
            };
            if frames.send(frame).await.is_err() {
                return Err(RenderError::SinkClosed);
            }
            self.frames_sent.fetch_add(1, Ordering::SeqCst);
        }

        Ok(())
    }
}

/// Script source that serves canned scripts.
#[derive(Debug, Default)]
pub struct MockScriptSource {
    scripts: Arc<RwLock<HashMap<String, String>>>,
    fail: Arc<RwLock<bool>>,
}

impl MockScriptSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, location: &str, script: &str) {
        self.scripts
            .write()
            .await
            .insert(location.to_string(), script.to_string());
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }
}

#[async_trait]
impl ScriptSource for MockScriptSource {
    /// Unknown locations get a placeholder script.
    async fn fetch_script(&self, location: &str) -> Result<String, RenderError> {
        if *self.fail.read().await {
            return Err(RenderError::ScriptUnavailable(location.to_string()));
        }
        Ok(self
            .scripts
            .read()
            .await
            .get(location)
            .cloned()
            .unwrap_or_else(|| format!("// sketch from {}", location)))
    }
}
