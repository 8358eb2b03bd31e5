//! Notifier trait and notification types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Pinning state shown for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinningState {
    Queued,
    Pending,
    Done,
    Failed,
}

impl PinningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Rendering progress of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Whole percent, rounded down.
    pub percent: u8,
    /// Estimated time left in milliseconds.
    pub remaining_ms: u64,
    pub pinned_count: usize,
    pub total_count: usize,
}

impl Progress {
    /// Progress after `done` of `total` frames, `elapsed_ms` after the start.
    ///
    /// The estimate assumes the remaining frames take as long on average as
    /// the finished ones.
    pub fn estimate(done: usize, total: usize, elapsed_ms: u64) -> Self {
        let percent = if total == 0 {
            100
        } else {
            ((done.min(total) * 100) / total) as u8
        };
        let remaining_ms = if done == 0 {
            0
        } else {
            let per_frame = elapsed_ms as f64 / done as f64;
            (per_frame * total.saturating_sub(done) as f64) as u64
        };

        Self {
            percent,
            remaining_ms,
            pinned_count: done,
            total_count: total,
        }
    }
}

/// A notification as emitted by [`Notifier`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Message {
        user_id: String,
        collection_id: String,
        network: String,
        message: String,
    },
    Progress {
        collection_id: String,
        progress: Progress,
    },
    PinningState {
        collection_id: String,
        state: PinningState,
    },
}

/// Delivers progress and messages to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_user(&self, user_id: &str, collection_id: &str, network: &str, message: &str);

    async fn set_progress(&self, collection_id: &str, progress: Progress);

    async fn set_pinning_state(&self, collection_id: &str, state: PinningState);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_estimate() {
        let progress = Progress::estimate(25, 100, 10_000);
        assert_eq!(progress.percent, 25);
        assert_eq!(progress.remaining_ms, 30_000);
        assert_eq!(progress.pinned_count, 25);
        assert_eq!(progress.total_count, 100);
    }

    #[test]
    fn test_progress_rounds_down() {
        assert_eq!(Progress::estimate(2, 3, 0).percent, 66);
        assert_eq!(Progress::estimate(3, 3, 0).percent, 100);
    }

    #[test]
    fn test_progress_no_frames_done() {
        let progress = Progress::estimate(0, 10, 5_000);
        assert_eq!(progress.percent, 0);
        assert_eq!(progress.remaining_ms, 0);
    }

    #[test]
    fn test_pinning_state_serialization() {
        assert_eq!(serde_json::to_string(&PinningState::Queued).unwrap(), "\"queued\"");
        assert_eq!(PinningState::Failed.as_str(), "failed");
    }

    #[test]
    fn test_notification_is_tagged() {
        let value = serde_json::to_value(Notification::PinningState {
            collection_id: "c".to_string(),
            state: PinningState::Done,
        })
        .unwrap();
        assert_eq!(value["type"], "pinning_state");
        assert_eq!(value["state"], "done");
    }
}
