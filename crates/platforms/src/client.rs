//! Shared HTTP client construction and response helpers.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response, StatusCode};
use tracing::{debug, trace};

use crate::error::ProviderError;
use crate::platform::Platform;

pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Per-request timeout used by [`default_client`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Install the process-wide rustls crypto provider once.
///
/// reqwest is built without a bundled provider, so this has to run before the
/// first client is created.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate got there first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// A client builder with the defaults every provider expects.
pub fn create_client_builder(timeout: Option<Duration>) -> ClientBuilder {
    install_rustls_provider();

    Client::builder()
        .user_agent(DEFAULT_UA)
        .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
}

pub fn default_client() -> Result<Client, ProviderError> {
    Ok(create_client_builder(None).build()?)
}

/// Read a response body, mapping HTTP failures to [`ProviderError`].
///
/// 404 is reported as [`ProviderError::ChannelNotFound`] so a misspelled
/// handle is distinguishable from an outage.
pub(crate) async fn read_body(
    platform: Platform,
    handle: &str,
    response: Response,
) -> Result<String, ProviderError> {
    let status = response.status();
    trace!(%platform, handle, status = status.as_u16(), "provider response");

    match status {
        StatusCode::NOT_FOUND => Err(ProviderError::ChannelNotFound(handle.to_string())),
        StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited { platform }),
        s if !s.is_success() => Err(ProviderError::UnexpectedStatus {
            platform,
            status: s.as_u16(),
        }),
        _ => Ok(response.text().await?),
    }
}

/// Check that a handle only contains characters the platform allows.
pub(crate) fn validate_handle(handle: &str, extra: &[char]) -> Result<(), ProviderError> {
    let valid = !handle.is_empty()
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || extra.contains(&c));

    if valid {
        Ok(())
    } else {
        Err(ProviderError::InvalidHandle(handle.to_string()))
    }
}
