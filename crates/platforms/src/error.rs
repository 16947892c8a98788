use thiserror::Error;

use crate::platform::Platform;

/// Failure to obtain a live status answer from a platform.
///
/// "The channel is offline" is never an error; see
/// [`ChannelStatus::Offline`](crate::ChannelStatus::Offline).
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("{platform} responded with status {status}")]
    UnexpectedStatus { platform: Platform, status: u16 },
    #[error("{platform} is rate limiting requests")]
    RateLimited { platform: Platform },
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    #[error("invalid channel handle: {0:?}")]
    InvalidHandle(String),
    #[error("missing credentials for {0}")]
    MissingCredentials(Platform),
    #[error("no provider registered for {0}")]
    Unsupported(Platform),
    #[error("other: {0}")]
    Other(String),
}

impl ProviderError {
    /// Whether retrying on a later tick may produce a different outcome.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::HttpError(_)
                | ProviderError::UnexpectedStatus { .. }
                | ProviderError::RateLimited { .. }
                | ProviderError::JsonError(_)
                | ProviderError::Other(_)
        )
    }
}
