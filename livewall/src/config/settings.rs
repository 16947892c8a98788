use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{Error, Result};

/// Scheduler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub enabled: bool,
    pub interval_secs: u64,
}

impl PollingConfig {
    pub const DEFAULT_INTERVAL_SECS: u64 = 60;

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::validation("polling interval must be positive"));
        }
        Ok(())
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: Self::DEFAULT_INTERVAL_SECS,
        }
    }
}

/// Global notification switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    /// Master switch.
    pub enabled: bool,
    /// Only notify for favorites.
    pub favorites_only: bool,
    pub desktop: bool,
    pub sound: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            favorites_only: false,
            desktop: true,
            sound: true,
        }
    }
}

/// User preferences persisted under the `settings` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub polling: PollingConfig,
    pub notifications: NotificationSettings,
    /// Capacity of the watch set.
    pub max_viewers: usize,
}

impl Settings {
    pub const DEFAULT_MAX_VIEWERS: usize = 4;

    pub fn validate(&self) -> Result<()> {
        self.polling.validate()?;
        if self.max_viewers == 0 {
            return Err(Error::validation("max viewers must be positive"));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            polling: PollingConfig::default(),
            notifications: NotificationSettings::default(),
            max_viewers: Self::DEFAULT_MAX_VIEWERS,
        }
    }
}

/// Shared, observable settings.
///
/// Updates are validated before they are published; an invalid update leaves
/// the current settings untouched.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    tx: std::sync::Arc<watch::Sender<Settings>>,
}

impl SettingsHandle {
    pub fn new(settings: Settings) -> Self {
        let (tx, _) = watch::channel(settings);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    pub fn get(&self) -> Settings {
        self.tx.borrow().clone()
    }

    pub fn notifications(&self) -> NotificationSettings {
        self.tx.borrow().notifications
    }

    pub fn polling(&self) -> PollingConfig {
        self.tx.borrow().polling
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Apply `f` to a copy of the settings, validate it and publish it.
    ///
    /// Returns the previous settings.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let mut next = self.get();
        let previous = next.clone();
        f(&mut next);
        next.validate()?;
        self.tx.send_replace(next);
        Ok(previous)
    }

    /// Replace the settings wholesale (after validation).
    pub fn replace(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.tx.send_replace(settings);
        Ok(())
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
