//! YouTube provider backed by the Data API v3.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::client::{read_body, validate_handle};
use crate::error::ProviderError;
use crate::media::{ChannelProfile, ChannelStatus, StreamInfo};
use crate::platform::Platform;
use crate::provider::StatusProvider;

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    #[serde(default)]
    high: Option<Thumbnail>,
    #[serde(default)]
    medium: Option<Thumbnail>,
    #[serde(default)]
    default: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.high
            .or(self.medium)
            .or(self.default)
            .map(|t| t.url)
    }
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    #[serde(default)]
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    // The API encodes this number as a string.
    #[serde(default)]
    concurrent_viewers: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    snippet: Snippet,
}

pub struct YouTube {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl YouTube {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        channel_id: &str,
    ) -> Result<String, ProviderError> {
        let Some(key) = &self.api_key else {
            return Err(ProviderError::MissingCredentials(Platform::YouTube));
        };

        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .query(query)
            .query(&[("key", key.as_str())])
            .send()
            .await?;

        read_body(Platform::YouTube, channel_id, response).await
    }

    /// Best-effort viewer count for a live video.
    async fn concurrent_viewers(&self, video_id: &str, channel_id: &str) -> Option<u64> {
        let body = self
            .get(
                "videos",
                &[("part", "liveStreamingDetails"), ("id", video_id)],
                channel_id,
            )
            .await;

        match body.and_then(|b| parse_viewers(&b)) {
            Ok(viewers) => viewers,
            Err(e) => {
                debug!(video_id, error = %e, "youtube viewer count unavailable");
                None
            }
        }
    }
}

/// Interpret a live `search` response, returning the live video id alongside.
pub(crate) fn parse_search(body: &str) -> Result<(ChannelStatus, Option<String>), ProviderError> {
    let response: ListResponse<SearchItem> = serde_json::from_str(body)?;

    let Some(item) = response.items.into_iter().next() else {
        return Ok((ChannelStatus::Offline, None));
    };

    let mut info = StreamInfo::new(Platform::YouTube, item.snippet.title);
    info.thumbnail_url = item.snippet.thumbnails.and_then(Thumbnails::best);

    Ok((ChannelStatus::Online(info), item.id.video_id))
}

pub(crate) fn parse_viewers(body: &str) -> Result<Option<u64>, ProviderError> {
    let response: ListResponse<VideoItem> = serde_json::from_str(body)?;
    Ok(response
        .items
        .into_iter()
        .next()
        .and_then(|v| v.live_streaming_details)
        .and_then(|d| d.concurrent_viewers)
        .and_then(|v| v.parse().ok()))
}

pub(crate) fn parse_channel(body: &str, channel_id: &str) -> Result<ChannelProfile, ProviderError> {
    let response: ListResponse<ChannelItem> = serde_json::from_str(body)?;
    let channel = response
        .items
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ChannelNotFound(channel_id.to_string()))?;

    Ok(ChannelProfile {
        display_name: channel.snippet.title,
        avatar_url: channel.snippet.thumbnails.and_then(Thumbnails::best),
    })
}

#[async_trait]
impl StatusProvider for YouTube {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn query(&self, handle: &str) -> Result<ChannelStatus, ProviderError> {
        validate_handle(handle, &['_', '-'])?;

        let body = self
            .get(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", handle),
                    ("eventType", "live"),
                    ("type", "video"),
                    ("maxResults", "1"),
                ],
                handle,
            )
            .await?;

        let (mut status, video_id) = parse_search(&body)?;
        if let (ChannelStatus::Online(info), Some(video_id)) = (&mut status, video_id) {
            info.viewer_count = self.concurrent_viewers(&video_id, handle).await;
        }

        debug!(channel_id = handle, online = status.is_online(), "youtube status");
        Ok(status)
    }

    async fn profile(&self, handle: &str) -> Result<ChannelProfile, ProviderError> {
        validate_handle(handle, &['_', '-'])?;

        let body = self
            .get("channels", &[("part", "snippet"), ("id", handle)], handle)
            .await?;
        parse_channel(&body, handle)
    }
}
