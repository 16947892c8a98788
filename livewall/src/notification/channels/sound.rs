//! Sound cue channel.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{ChannelKind, NotificationChannel};
use crate::notification::LiveNotification;
use crate::{Error, Result};

/// Plays a sound by running an external player command,
/// e.g. `paplay /usr/share/sounds/freedesktop/stereo/message.oga`.
#[derive(Debug, Clone)]
pub struct SoundChannel {
    program: String,
    args: Vec<String>,
}

impl SoundChannel {
    /// Parse a whitespace separated command line. Returns `None` when blank.
    pub fn from_command(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[async_trait]
impl NotificationChannel for SoundChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sound
    }

    fn is_enabled(&self) -> bool {
        !self.program.is_empty()
    }

    async fn deliver(&self, notification: &LiveNotification) -> Result<()> {
        debug!(entity = %notification.entity_id, "playing sound cue");
        let status = Command::new(&self.program).args(&self.args).status().await?;
        if !status.success() {
            return Err(Error::notification(format!(
                "sound command {} exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command() {
        let channel = SoundChannel::from_command("paplay  /tmp/ding.oga").unwrap();
        assert_eq!(channel.program(), "paplay");
        assert_eq!(channel.args(), ["/tmp/ding.oga"]);
        assert!(channel.is_enabled());
    }

    #[test]
    fn test_blank_command() {
        assert!(SoundChannel::from_command("   ").is_none());
    }
}
