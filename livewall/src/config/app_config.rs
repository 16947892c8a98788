use std::path::PathBuf;
use std::time::Duration;

use platforms_status::ProviderCredentials;

use crate::{Error, Result};

/// Process configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub credentials: ProviderCredentials,
    pub webhook_url: Option<String>,
    pub sound_command: Option<String>,
    /// Delay before the first evaluation after polling starts.
    pub settle_delay: Duration,
}

impl AppConfig {
    pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1500;

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let settle_delay = match get("LIVEWALL_SETTLE_DELAY_MS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Error::config(format!("LIVEWALL_SETTLE_DELAY_MS is not a number: {}", raw))
            })?,
            None => Self::DEFAULT_SETTLE_DELAY_MS,
        };

        Ok(Self {
            data_dir: get("LIVEWALL_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data")),
            log_dir: get("LIVEWALL_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./logs")),
            credentials: ProviderCredentials {
                twitch_client_id: get("TWITCH_CLIENT_ID"),
                twitch_access_token: get("TWITCH_ACCESS_TOKEN"),
                youtube_api_key: get("YOUTUBE_API_KEY"),
            },
            webhook_url: get("LIVEWALL_WEBHOOK_URL"),
            sound_command: get("LIVEWALL_SOUND_COMMAND"),
            settle_delay: Duration::from_millis(settle_delay),
        })
    }
}
