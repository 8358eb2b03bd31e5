//! Error types for the renderer module.

use thiserror::Error;

/// Errors that can occur while fetching scripts or rendering frames.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The item script could not be fetched.
    #[error("script unavailable: {0}")]
    ScriptUnavailable(String),

    /// The render command could not be started.
    #[error("failed to start renderer: {0}")]
    Spawn(String),

    /// A frame failed to render.
    #[error("frame {index} failed: {reason}")]
    FrameFailed { index: usize, reason: String },

    /// A frame exceeded its timeout.
    #[error("frame {index} timed out after {timeout_secs} seconds")]
    Timeout { index: usize, timeout_secs: u64 },

    /// The frame receiver went away.
    #[error("frame sink closed")]
    SinkClosed,

    /// Rendering was cancelled.
    #[error("rendering cancelled")]
    Cancelled,
}

impl RenderError {
    pub fn frame_failed(index: usize, reason: impl Into<String>) -> Self {
        Self::FrameFailed {
            index,
            reason: reason.into(),
        }
    }
}
