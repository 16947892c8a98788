use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Supported streaming platforms.
///
/// Variant order is the fixed precedence used everywhere a single platform has
/// to be picked: Twitch first, then Kick, then YouTube. The derived `Ord`
/// follows the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    Kick,
    YouTube,
}

impl Platform {
    /// All platforms in precedence order.
    pub const PRECEDENCE: [Platform; 3] = [Platform::Twitch, Platform::Kick, Platform::YouTube];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitch => "twitch",
            Self::Kick => "kick",
            Self::YouTube => "youtube",
        }
    }

    /// Human-friendly platform name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Twitch => "Twitch",
            Self::Kick => "Kick",
            Self::YouTube => "YouTube",
        }
    }

    /// Position in the precedence order, 0 being the highest.
    pub fn rank(&self) -> usize {
        match self {
            Self::Twitch => 0,
            Self::Kick => 1,
            Self::YouTube => 2,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "twitch" => Ok(Self::Twitch),
            "kick" => Ok(Self::Kick),
            "youtube" => Ok(Self::YouTube),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_matches_ord() {
        let mut sorted = Platform::PRECEDENCE;
        sorted.sort();
        assert_eq!(sorted, Platform::PRECEDENCE);

        for (i, platform) in Platform::PRECEDENCE.iter().enumerate() {
            assert_eq!(platform.rank(), i);
        }
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!("twitch".parse::<Platform>().unwrap(), Platform::Twitch);
        assert_eq!(" Kick ".parse::<Platform>().unwrap(), Platform::Kick);
        assert_eq!("YouTube".parse::<Platform>().unwrap(), Platform::YouTube);
        assert!("trovo".parse::<Platform>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_ids() {
        let json = serde_json::to_string(&Platform::YouTube).unwrap();
        assert_eq!(json, "\"youtube\"");

        let parsed: Platform = serde_json::from_str("\"kick\"").unwrap();
        assert_eq!(parsed, Platform::Kick);
    }
}
