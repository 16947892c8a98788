use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Metadata about a live stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Platform the stream was observed on.
    pub platform: Platform,
    pub title: String,
    pub category: Option<String>,
    pub viewer_count: Option<u64>,
    pub thumbnail_url: Option<String>,
}

impl StreamInfo {
    pub fn new(platform: Platform, title: impl Into<String>) -> Self {
        Self {
            platform,
            title: title.into(),
            category: None,
            viewer_count: None,
            thumbnail_url: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_viewer_count(mut self, viewers: u64) -> Self {
        self.viewer_count = Some(viewers);
        self
    }

    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }
}

/// An explicit answer from a platform about a channel.
///
/// Failure to obtain an answer is not a status; it is a
/// [`ProviderError`](crate::ProviderError).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "info", rename_all = "lowercase")]
pub enum ChannelStatus {
    Online(StreamInfo),
    Offline,
}

impl ChannelStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, ChannelStatus::Online(_))
    }

    pub fn info(&self) -> Option<&StreamInfo> {
        match self {
            ChannelStatus::Online(info) => Some(info),
            ChannelStatus::Offline => None,
        }
    }

    pub fn into_info(self) -> Option<StreamInfo> {
        match self {
            ChannelStatus::Online(info) => Some(info),
            ChannelStatus::Offline => None,
        }
    }
}

/// Cosmetic channel data used when an entity is first created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelProfile {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl ChannelProfile {
    /// Fallback profile built from the raw channel handle.
    pub fn from_handle(handle: &str) -> Self {
        Self {
            display_name: handle.trim().to_string(),
            avatar_url: None,
        }
    }
}
