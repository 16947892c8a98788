//! Kick provider backed by the public channel API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::client::{read_body, validate_handle};
use crate::error::ProviderError;
use crate::media::{ChannelProfile, ChannelStatus, StreamInfo};
use crate::platform::Platform;
use crate::provider::StatusProvider;

const BASE_URL: &str = "https://kick.com/api/v2";

#[derive(Debug, Deserialize)]
struct KickChannel {
    #[serde(default)]
    user: Option<KickUser>,
    #[serde(default)]
    livestream: Option<KickLivestream>,
}

#[derive(Debug, Deserialize)]
struct KickUser {
    username: String,
    #[serde(default)]
    profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KickLivestream {
    #[serde(default)]
    session_title: Option<String>,
    #[serde(default)]
    is_live: Option<bool>,
    #[serde(default)]
    viewer_count: Option<u64>,
    #[serde(default)]
    categories: Vec<KickCategory>,
    #[serde(default)]
    thumbnail: Option<KickThumbnail>,
}

#[derive(Debug, Deserialize)]
struct KickCategory {
    name: String,
}

#[derive(Debug, Deserialize)]
struct KickThumbnail {
    #[serde(default)]
    url: Option<String>,
}

pub struct Kick {
    client: Client,
    base_url: String,
}

impl Kick {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_channel(&self, slug: &str) -> Result<KickChannel, ProviderError> {
        let response = self
            .client
            .get(format!("{}/channels/{}", self.base_url, slug))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let body = read_body(Platform::Kick, slug, response).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

fn channel_status(channel: KickChannel) -> ChannelStatus {
    let Some(live) = channel.livestream else {
        return ChannelStatus::Offline;
    };
    // Older payloads omit `is_live`; a present livestream object means live.
    if live.is_live == Some(false) {
        return ChannelStatus::Offline;
    }

    let mut info = StreamInfo::new(Platform::Kick, live.session_title.unwrap_or_default());
    info.category = live.categories.into_iter().next().map(|c| c.name);
    info.viewer_count = live.viewer_count;
    info.thumbnail_url = live.thumbnail.and_then(|t| t.url);
    ChannelStatus::Online(info)
}

pub(crate) fn parse_channel(body: &str) -> Result<ChannelStatus, ProviderError> {
    let channel: KickChannel = serde_json::from_str(body)?;
    Ok(channel_status(channel))
}

#[async_trait]
impl StatusProvider for Kick {
    fn platform(&self) -> Platform {
        Platform::Kick
    }

    async fn query(&self, handle: &str) -> Result<ChannelStatus, ProviderError> {
        validate_handle(handle, &['_', '-'])?;
        let slug = handle.to_ascii_lowercase();

        let status = channel_status(self.fetch_channel(&slug).await?);
        debug!(slug = %slug, online = status.is_online(), "kick status");
        Ok(status)
    }

    async fn profile(&self, handle: &str) -> Result<ChannelProfile, ProviderError> {
        validate_handle(handle, &['_', '-'])?;
        let slug = handle.to_ascii_lowercase();

        let channel = self.fetch_channel(&slug).await?;
        Ok(match channel.user {
            Some(user) => ChannelProfile {
                display_name: user.username,
                avatar_url: user.profile_pic.filter(|u| !u.is_empty()),
            },
            None => ChannelProfile::from_handle(handle),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_live_channel() {
        let body = r#"{
            "id": 1,
            "slug": "someone",
            "user": {"username": "SomeOne", "profile_pic": "https://files.kick.com/a.webp"},
            "livestream": {
                "id": 99,
                "session_title": "IRL walk",
                "is_live": true,
                "viewer_count": 88,
                "categories": [{"id": 1, "name": "IRL"}, {"id": 2, "name": "Travel"}],
                "thumbnail": {"url": "https://images.kick.com/thumb.webp"}
            }
        }"#;

        let status = parse_channel(body).unwrap();
        let info = status.info().unwrap();
        assert_eq!(info.platform, Platform::Kick);
        assert_eq!(info.title, "IRL walk");
        assert_eq!(info.category.as_deref(), Some("IRL"));
        assert_eq!(info.viewer_count, Some(88));
        assert_eq!(
            info.thumbnail_url.as_deref(),
            Some("https://images.kick.com/thumb.webp")
        );
    }

    #[test]
    fn test_parse_offline_channel() {
        let body = r#"{"id": 1, "slug": "someone", "livestream": null}"#;
        assert_eq!(parse_channel(body).unwrap(), ChannelStatus::Offline);

        let body = r#"{"livestream": {"session_title": "ended", "is_live": false}}"#;
        assert_eq!(parse_channel(body).unwrap(), ChannelStatus::Offline);
    }

    #[tokio::test]
    async fn test_invalid_slug_rejected_before_request() {
        let kick = Kick::new(crate::client::default_client().unwrap())
            .with_base_url("http://127.0.0.1:9");
        let err = kick.query("not/a/slug").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidHandle(_)));
    }
}
