//! In-app toast channel.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use super::{ChannelKind, NotificationChannel};
use crate::Result;
use crate::notification::LiveNotification;

/// Publishes notifications to in-process subscribers (the rendering layer).
#[derive(Debug, Clone)]
pub struct ToastChannel {
    sender: broadcast::Sender<LiveNotification>,
}

impl ToastChannel {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveNotification> {
        self.sender.subscribe()
    }
}

impl Default for ToastChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationChannel for ToastChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Toast
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn deliver(&self, notification: &LiveNotification) -> Result<()> {
        // Nobody rendering toasts is not a failure.
        if self.sender.send(notification.clone()).is_err() {
            trace!("no toast subscribers");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;
    use platforms_status::{Platform, StreamInfo};

    #[tokio::test]
    async fn test_toast_reaches_subscriber() {
        let channel = ToastChannel::new();
        let mut rx = channel.subscribe();
        let notification = LiveNotification::new(
            EntityId::from("e1"),
            "Alice",
            StreamInfo::new(Platform::Kick, "hello"),
        );

        channel.deliver(&notification).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), notification);
    }

    #[tokio::test]
    async fn test_toast_without_subscribers_is_ok() {
        let channel = ToastChannel::new();
        let notification = LiveNotification::new(
            EntityId::from("e1"),
            "Alice",
            StreamInfo::new(Platform::Kick, "hello"),
        );
        assert!(channel.deliver(&notification).await.is_ok());
    }
}
