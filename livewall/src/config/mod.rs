//! Configuration.
//!
//! [`Settings`] are the user-editable, persisted preferences. [`AppConfig`]
//! is the process configuration read from the environment at startup.

mod app_config;
mod settings;

pub use app_config::AppConfig;
pub use settings::{NotificationSettings, PollingConfig, Settings, SettingsHandle};
