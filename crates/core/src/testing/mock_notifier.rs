//! Mock notifier for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notify::{Notification, Notifier, PinningState, Progress};

/// Records every notification for assertions.
#[derive(Debug, Default)]
pub struct MockNotifier {
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.clone()
    }

    /// Text of every user message, in order.
    pub async fn messages(&self) -> Vec<String> {
        self.notifications
            .read()
            .await
            .iter()
            .filter_map(|n| match n {
                Notification::Message { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn pinning_states(&self) -> Vec<PinningState> {
        self.notifications
            .read()
            .await
            .iter()
            .filter_map(|n| match n {
                Notification::PinningState { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub async fn progress_updates(&self) -> Vec<Progress> {
        self.notifications
            .read()
            .await
            .iter()
            .filter_map(|n| match n {
                Notification::Progress { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn notify_user(&self, user_id: &str, collection_id: &str, network: &str, message: &str) {
        self.notifications.write().await.push(Notification::Message {
            user_id: user_id.to_string(),
            collection_id: collection_id.to_string(),
            network: network.to_string(),
            message: message.to_string(),
        });
    }

    async fn set_progress(&self, collection_id: &str, progress: Progress) {
        self.notifications.write().await.push(Notification::Progress {
            collection_id: collection_id.to_string(),
            progress,
        });
    }

    async fn set_pinning_state(&self, collection_id: &str, state: PinningState) {
        self.notifications
            .write()
            .await
            .push(Notification::PinningState {
                collection_id: collection_id.to_string(),
                state,
            });
    }
}
