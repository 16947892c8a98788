//! Provider trait and registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::ProviderError;
use crate::media::{ChannelProfile, ChannelStatus};
use crate::platform::Platform;
use crate::platforms::{Kick, Twitch, YouTube};

/// Answers live status queries for one platform.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// The platform this provider speaks for.
    fn platform(&self) -> Platform;

    /// Query whether `handle` is live.
    ///
    /// Returns `Ok(ChannelStatus::Offline)` only for an explicit negative
    /// answer. Anything that prevents an answer is an error.
    async fn query(&self, handle: &str) -> Result<ChannelStatus, ProviderError>;

    /// Fetch cosmetic channel data (display name, avatar).
    async fn profile(&self, handle: &str) -> Result<ChannelProfile, ProviderError> {
        Ok(ChannelProfile::from_handle(handle))
    }
}

/// Credentials for the platforms whose APIs require them.
#[derive(Debug, Clone, Default)]
pub struct ProviderCredentials {
    pub twitch_client_id: Option<String>,
    pub twitch_access_token: Option<String>,
    pub youtube_api_key: Option<String>,
}

/// Registry of providers keyed by platform.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<Platform, Arc<dyn StatusProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in provider for every platform.
    pub fn with_defaults(client: Client, credentials: ProviderCredentials) -> Self {
        let mut registry = Self::new();
        registry
            .register(Arc::new(Twitch::new(
                client.clone(),
                credentials.twitch_client_id,
                credentials.twitch_access_token,
            )))
            .register(Arc::new(Kick::new(client.clone())))
            .register(Arc::new(YouTube::new(client, credentials.youtube_api_key)));
        registry
    }

    /// Register a provider, replacing any previous one for the same platform.
    pub fn register(&mut self, provider: Arc<dyn StatusProvider>) -> &mut Self {
        let platform = provider.platform();
        if self.providers.insert(platform, provider).is_some() {
            debug!(%platform, "replaced status provider");
        }
        self
    }

    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn StatusProvider>> {
        self.providers.get(&platform)
    }

    pub fn is_supported(&self, platform: Platform) -> bool {
        self.providers.contains_key(&platform)
    }

    /// Registered platforms in precedence order.
    pub fn platforms(&self) -> Vec<Platform> {
        Platform::PRECEDENCE
            .into_iter()
            .filter(|p| self.providers.contains_key(p))
            .collect()
    }

    fn provider_for(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<(&Arc<dyn StatusProvider>, String), ProviderError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(ProviderError::InvalidHandle(handle.to_string()));
        }
        let provider = self
            .get(platform)
            .ok_or(ProviderError::Unsupported(platform))?;
        Ok((provider, handle.to_string()))
    }

    /// Query `platform` for `handle`.
    pub async fn query(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<ChannelStatus, ProviderError> {
        let (provider, handle) = self.provider_for(platform, handle)?;
        debug!(%platform, handle = %handle, "querying live status");
        provider.query(&handle).await
    }

    pub async fn profile(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<ChannelProfile, ProviderError> {
        let (provider, handle) = self.provider_for(platform, handle)?;
        provider.profile(&handle).await
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("platforms", &self.platforms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::StreamInfo;

    struct FixedProvider {
        platform: Platform,
        status: ChannelStatus,
    }

    #[async_trait]
    impl StatusProvider for FixedProvider {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn query(&self, _handle: &str) -> Result<ChannelStatus, ProviderError> {
            Ok(self.status.clone())
        }
    }

    #[tokio::test]
    async fn test_registry_routes_by_platform() {
        let mut registry = ProviderRegistry::new();
        registry
            .register(Arc::new(FixedProvider {
                platform: Platform::Kick,
                status: ChannelStatus::Online(StreamInfo::new(Platform::Kick, "hello")),
            }))
            .register(Arc::new(FixedProvider {
                platform: Platform::Twitch,
                status: ChannelStatus::Offline,
            }));

        assert_eq!(registry.platforms(), vec![Platform::Twitch, Platform::Kick]);

        let kick = registry.query(Platform::Kick, "someone").await.unwrap();
        assert!(kick.is_online());

        let twitch = registry.query(Platform::Twitch, "someone").await.unwrap();
        assert_eq!(twitch, ChannelStatus::Offline);
    }

    #[tokio::test]
    async fn test_registry_unsupported_and_blank_handle() {
        let registry = ProviderRegistry::new();

        let err = registry.query(Platform::YouTube, "abc").await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(Platform::YouTube)));

        let err = registry.query(Platform::YouTube, "   ").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidHandle(_)));
    }

    #[tokio::test]
    async fn test_default_profile_uses_handle() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(FixedProvider {
            platform: Platform::Kick,
            status: ChannelStatus::Offline,
        }));

        let profile = registry.profile(Platform::Kick, " streamer ").await.unwrap();
        assert_eq!(profile.display_name, "streamer");
    }
}
