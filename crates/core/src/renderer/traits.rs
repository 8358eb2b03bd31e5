//! Renderer and script source traits.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::RenderError;

/// One rendered frame. `index` is zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFrame {
    pub index: usize,
    pub data: Vec<u8>,
}

/// Renders `frame_count` frames of a generative script.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renderer name for logging.
    fn name(&self) -> &str;

    /// Render every frame and send it to `frames` as soon as it is ready.
    ///
    /// Frames may arrive out of order. Once `cancel` fires no further frames
    /// are sent and the call returns [`RenderError::Cancelled`].
    async fn render(
        &self,
        script: String,
        frame_count: usize,
        frames: mpsc::Sender<RenderedFrame>,
        cancel: CancellationToken,
    ) -> Result<(), RenderError>;
}

/// Resolves an item's script location to its source text.
#[async_trait]
pub trait ScriptSource: Send + Sync {
    async fn fetch_script(&self, location: &str) -> Result<String, RenderError>;
}
