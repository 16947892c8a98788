use std::sync::Arc;

use tracing::{debug, warn};

use super::{LiveNotification, NotificationChannel};
use crate::config::SettingsHandle;

/// Fans notifications out to the configured channels.
#[derive(Clone)]
pub struct NotificationDispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
    settings: SettingsHandle,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<Arc<dyn NotificationChannel>>, settings: SettingsHandle) -> Self {
        Self { channels, settings }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Deliver `notification` to every enabled channel without waiting.
    ///
    /// Must be called from within a tokio runtime. Returns the number of
    /// channels the notification was handed to.
    pub fn dispatch(&self, notification: LiveNotification) -> usize {
        let settings = self.settings.notifications();
        let notification = Arc::new(notification);
        let mut handed_off = 0;

        for channel in &self.channels {
            if !channel.is_enabled() || !channel.kind().allowed_by(&settings) {
                continue;
            }

            let channel = Arc::clone(channel);
            let notification = Arc::clone(&notification);
            tokio::spawn(async move {
                match channel.deliver(&notification).await {
                    Ok(()) => debug!(
                        channel = channel.channel_type(),
                        entity = %notification.entity_id,
                        "notification delivered"
                    ),
                    Err(e) => warn!(
                        channel = channel.channel_type(),
                        entity = %notification.entity_id,
                        "notification delivery failed: {}",
                        e
                    ),
                }
            });
            handed_off += 1;
        }

        handed_off
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.channels.iter().map(|c| c.channel_type()).collect();
        f.debug_struct("NotificationDispatcher")
            .field("channels", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;
    use crate::notification::ChannelKind;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use platforms_status::{Platform, StreamInfo};
    use tokio::sync::mpsc;

    struct RecordingChannel {
        kind: ChannelKind,
        fail: bool,
        tx: mpsc::UnboundedSender<(ChannelKind, EntityId)>,
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn deliver(&self, notification: &LiveNotification) -> Result<()> {
            let _ = self.tx.send((self.kind, notification.entity_id.clone()));
            if self.fail {
                return Err(Error::notification("boom"));
            }
            Ok(())
        }
    }

    fn notification() -> LiveNotification {
        LiveNotification::new(
            EntityId::from("e1"),
            "Alice",
            StreamInfo::new(Platform::Twitch, "hi"),
        )
    }

    fn channels(
        kinds: &[(ChannelKind, bool)],
    ) -> (
        Vec<Arc<dyn NotificationChannel>>,
        mpsc::UnboundedReceiver<(ChannelKind, EntityId)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channels = kinds
            .iter()
            .map(|&(kind, fail)| {
                Arc::new(RecordingChannel {
                    kind,
                    fail,
                    tx: tx.clone(),
                }) as Arc<dyn NotificationChannel>
            })
            .collect();
        (channels, rx)
    }

    #[tokio::test]
    async fn test_dispatch_reaches_every_channel_even_if_one_fails() {
        let (channels, mut rx) = channels(&[
            (ChannelKind::Toast, false),
            (ChannelKind::Webhook, true),
            (ChannelKind::Desktop, false),
        ]);
        let dispatcher = NotificationDispatcher::new(channels, SettingsHandle::default());

        assert_eq!(dispatcher.dispatch(notification()), 3);

        let mut kinds = Vec::new();
        for _ in 0..3 {
            kinds.push(rx.recv().await.unwrap().0);
        }
        assert!(kinds.contains(&ChannelKind::Toast));
        assert!(kinds.contains(&ChannelKind::Webhook));
        assert!(kinds.contains(&ChannelKind::Desktop));
    }

    #[tokio::test]
    async fn test_desktop_and_sound_follow_settings() {
        let (channels, mut rx) = channels(&[
            (ChannelKind::Toast, false),
            (ChannelKind::Desktop, false),
            (ChannelKind::Sound, false),
        ]);
        let settings = SettingsHandle::default();
        settings
            .update(|s| {
                s.notifications.desktop = false;
                s.notifications.sound = false;
            })
            .unwrap();
        let dispatcher = NotificationDispatcher::new(channels, settings);

        assert_eq!(dispatcher.dispatch(notification()), 1);
        assert_eq!(rx.recv().await.unwrap().0, ChannelKind::Toast);
    }
}
