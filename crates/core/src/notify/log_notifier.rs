//! Notifier that writes to the tracing log.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::info;

use super::{Notification, Notifier, PinningState, Progress};

/// Logs every notification and republishes it on a broadcast channel.
pub struct LogNotifier {
    tx: broadcast::Sender<Notification>,
}

impl LogNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive notifications emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    fn publish(&self, notification: Notification) {
        // No subscribers is fine.
        let _ = self.tx.send(notification);
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_user(&self, user_id: &str, collection_id: &str, network: &str, message: &str) {
        info!(user_id, collection_id, network, message, "User notification");
        self.publish(Notification::Message {
            user_id: user_id.to_string(),
            collection_id: collection_id.to_string(),
            network: network.to_string(),
            message: message.to_string(),
        });
    }

    async fn set_progress(&self, collection_id: &str, progress: Progress) {
        info!(
            collection_id,
            percent = progress.percent,
            remaining_ms = progress.remaining_ms,
            pinned = progress.pinned_count,
            total = progress.total_count,
            "Progress"
        );
        self.publish(Notification::Progress {
            collection_id: collection_id.to_string(),
            progress,
        });
    }

    async fn set_pinning_state(&self, collection_id: &str, state: PinningState) {
        info!(collection_id, state = state.as_str(), "Pinning state");
        self.publish(Notification::PinningState {
            collection_id: collection_id.to_string(),
            state,
        });
    }
}
