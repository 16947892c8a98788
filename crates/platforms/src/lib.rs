//! Live status providers for streaming platforms.
//!
//! Each supported platform is wrapped by a [`StatusProvider`] that answers a
//! single question: is this channel live right now, and if so, what is it
//! streaming. Providers are registered in a [`ProviderRegistry`] keyed by
//! [`Platform`].
//!
//! A provider never reports "offline" for a request it could not answer; those
//! cases surface as a [`ProviderError`] so callers can tell "unknown" apart from
//! an explicit negative answer.

pub mod client;
pub mod error;
pub mod media;
pub mod platform;
pub mod platforms;
pub mod provider;

pub use error::ProviderError;
pub use media::{ChannelProfile, ChannelStatus, StreamInfo};
pub use platform::{Platform, UnknownPlatform};
pub use provider::{ProviderCredentials, ProviderRegistry, StatusProvider};
