//! Generic webhook notification channel.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use super::{ChannelKind, NotificationChannel};
use crate::notification::LiveNotification;
use crate::{Error, Result};

/// Webhook channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub url: String,
    /// Custom headers.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    pub auth: Option<WebhookAuth>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

impl WebhookConfig {
    /// An enabled webhook posting to `url`.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            url: url.into(),
            ..Default::default()
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: String::new(),
            headers: Vec::new(),
            auth: None,
            timeout_secs: default_timeout(),
        }
    }
}

/// Webhook authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookAuth {
    Bearer { token: String },
    Header { name: String, value: String },
}

/// Posts a JSON document for every notification.
pub struct WebhookChannel {
    config: WebhookConfig,
    client: Client,
}

impl WebhookChannel {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        platforms_status::client::install_rustls_provider();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build webhook client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.config.headers {
            if let (Ok(name), Ok(value)) = (
                name.parse::<reqwest::header::HeaderName>(),
                value.parse::<reqwest::header::HeaderValue>(),
            ) {
                headers.insert(name, value);
            }
        }

        match &self.config.auth {
            Some(WebhookAuth::Bearer { token }) => {
                if let Ok(value) = format!("Bearer {}", token).parse() {
                    headers.insert(reqwest::header::AUTHORIZATION, value);
                }
            }
            Some(WebhookAuth::Header { name, value }) => {
                if let (Ok(name), Ok(value)) = (
                    name.parse::<reqwest::header::HeaderName>(),
                    value.parse::<reqwest::header::HeaderValue>(),
                ) {
                    headers.insert(name, value);
                }
            }
            None => {}
        }

        headers
    }

    fn build_payload(&self, notification: &LiveNotification) -> serde_json::Value {
        json!({
            "event_type": "entity_online",
            "title": notification.title(),
            "description": notification.body(),
            "timestamp": notification.timestamp.to_rfc3339(),
            "entity_id": notification.entity_id,
            "data": notification
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.url.is_empty()
    }

    async fn deliver(&self, notification: &LiveNotification) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let response = self
            .client
            .post(&self.config.url)
            .headers(self.build_headers())
            .json(&self.build_payload(notification))
            .send()
            .await
            .map_err(|e| Error::notification(format!("webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Webhook failed: {} - {}", status, body);
            return Err(Error::notification(format!(
                "webhook failed: {} - {}",
                status, body
            )));
        }

        debug!("Webhook notification sent for {}", notification.entity_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntityId;
    use platforms_status::{Platform, StreamInfo};

    #[test]
    fn test_webhook_config_default() {
        let config = WebhookConfig::default();
        assert!(!config.enabled);
        assert!(config.url.is_empty());
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_webhook_channel_disabled() {
        let channel = WebhookChannel::new(WebhookConfig::default()).unwrap();
        assert!(!channel.is_enabled());

        let channel = WebhookChannel::new(WebhookConfig::for_url("http://localhost/hook")).unwrap();
        assert!(channel.is_enabled());
    }

    #[test]
    fn test_build_payload() {
        let channel = WebhookChannel::new(WebhookConfig::default()).unwrap();
        let notification = LiveNotification::new(
            EntityId::from("123"),
            "TestStreamer",
            StreamInfo::new(Platform::YouTube, "Playing Games").with_category("Gaming"),
        );

        let payload = channel.build_payload(&notification);
        assert_eq!(payload["event_type"], "entity_online");
        assert_eq!(payload["entity_id"], "123");
        assert_eq!(payload["title"], "TestStreamer is live on YouTube");
        assert_eq!(payload["data"]["info"]["category"], "Gaming");
    }

    #[test]
    fn test_build_headers_with_bearer() {
        let config = WebhookConfig {
            auth: Some(WebhookAuth::Bearer {
                token: "secret".to_string(),
            }),
            headers: vec![("X-Source".to_string(), "livewall".to_string())],
            ..WebhookConfig::for_url("http://localhost/hook")
        };
        let channel = WebhookChannel::new(config).unwrap();
        let headers = channel.build_headers();
        assert_eq!(headers.get("authorization").unwrap(), "Bearer secret");
        assert_eq!(headers.get("x-source").unwrap(), "livewall");
    }
}
