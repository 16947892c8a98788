//! Notification channels.
//!
//! - Toast: in-process broadcast consumed by the UI
//! - Desktop: OS notifications, subject to a permission state
//! - Sound: plays a cue through an external player command
//! - Webhook: generic HTTP POST

mod desktop;
mod sound;
mod toast;
mod webhook;

pub use desktop::{DesktopBackend, DesktopChannel, NotifySendBackend, PermissionState};
pub use sound::SoundChannel;
pub use toast::ToastChannel;
pub use webhook::{WebhookAuth, WebhookChannel, WebhookConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::LiveNotification;
use crate::Result;
use crate::config::NotificationSettings;

/// Kinds of delivery channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Toast,
    Desktop,
    Sound,
    Webhook,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toast => "toast",
            Self::Desktop => "desktop",
            Self::Sound => "sound",
            Self::Webhook => "webhook",
        }
    }

    /// Whether the user's settings allow this kind of channel right now.
    pub fn allowed_by(&self, settings: &NotificationSettings) -> bool {
        match self {
            Self::Desktop => settings.desktop,
            Self::Sound => settings.sound,
            Self::Toast | Self::Webhook => true,
        }
    }
}

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    /// Get the channel type name.
    fn channel_type(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Check if the channel is enabled.
    fn is_enabled(&self) -> bool;

    /// Deliver a notification through this channel.
    async fn deliver(&self, notification: &LiveNotification) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_gate_desktop_and_sound_only() {
        let settings = NotificationSettings {
            desktop: false,
            sound: false,
            ..Default::default()
        };
        assert!(!ChannelKind::Desktop.allowed_by(&settings));
        assert!(!ChannelKind::Sound.allowed_by(&settings));
        assert!(ChannelKind::Toast.allowed_by(&settings));
        assert!(ChannelKind::Webhook.allowed_by(&settings));
    }
}
