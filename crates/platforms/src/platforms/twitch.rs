//! Twitch provider backed by the Helix API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::client::{read_body, validate_handle};
use crate::error::ProviderError;
use crate::media::{ChannelProfile, ChannelStatus, StreamInfo};
use crate::platform::Platform;
use crate::provider::StatusProvider;

const HELIX_URL: &str = "https://api.twitch.tv/helix";

const THUMBNAIL_WIDTH: &str = "1280";
const THUMBNAIL_HEIGHT: &str = "720";

#[derive(Debug, Deserialize)]
struct HelixResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct HelixStream {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    game_name: Option<String>,
    #[serde(default)]
    viewer_count: Option<u64>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    display_name: String,
    #[serde(default)]
    profile_image_url: Option<String>,
}

pub struct Twitch {
    client: Client,
    client_id: Option<String>,
    access_token: Option<String>,
    base_url: String,
}

impl Twitch {
    pub fn new(client: Client, client_id: Option<String>, access_token: Option<String>) -> Self {
        Self {
            client,
            client_id: client_id.filter(|s| !s.is_empty()),
            access_token: access_token.filter(|s| !s.is_empty()),
            base_url: HELIX_URL.to_string(),
        }
    }

    /// Point the provider at a different Helix endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
        login: &str,
    ) -> Result<String, ProviderError> {
        let (Some(client_id), Some(token)) = (&self.client_id, &self.access_token) else {
            return Err(ProviderError::MissingCredentials(Platform::Twitch));
        };

        let response = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .header("Client-Id", client_id)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        read_body(Platform::Twitch, login, response).await
    }
}

/// Interpret a `/streams` response body.
pub(crate) fn parse_streams(body: &str) -> Result<ChannelStatus, ProviderError> {
    let response: HelixResponse<HelixStream> = serde_json::from_str(body)?;

    let Some(stream) = response.data.into_iter().find(|s| s.kind == "live") else {
        return Ok(ChannelStatus::Offline);
    };

    let mut info = StreamInfo::new(Platform::Twitch, stream.title);
    info.category = stream.game_name.filter(|g| !g.is_empty());
    info.viewer_count = stream.viewer_count;
    info.thumbnail_url = stream.thumbnail_url.map(|url| {
        url.replace("{width}", THUMBNAIL_WIDTH)
            .replace("{height}", THUMBNAIL_HEIGHT)
    });

    Ok(ChannelStatus::Online(info))
}

pub(crate) fn parse_user(body: &str, login: &str) -> Result<ChannelProfile, ProviderError> {
    let response: HelixResponse<HelixUser> = serde_json::from_str(body)?;
    let user = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::ChannelNotFound(login.to_string()))?;

    Ok(ChannelProfile {
        display_name: user.display_name,
        avatar_url: user.profile_image_url.filter(|u| !u.is_empty()),
    })
}

#[async_trait]
impl StatusProvider for Twitch {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn query(&self, handle: &str) -> Result<ChannelStatus, ProviderError> {
        validate_handle(handle, &['_'])?;
        let login = handle.to_ascii_lowercase();

        let body = self.get("streams", &[("user_login", &login)], &login).await?;
        let status = parse_streams(&body)?;
        debug!(login = %login, online = status.is_online(), "twitch status");
        Ok(status)
    }

    async fn profile(&self, handle: &str) -> Result<ChannelProfile, ProviderError> {
        validate_handle(handle, &['_'])?;
        let login = handle.to_ascii_lowercase();

        let body = self.get("users", &[("login", &login)], &login).await?;
        parse_user(&body, &login)
    }
}
