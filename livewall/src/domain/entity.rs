//! Tracked entity model.

use std::fmt;

use chrono::{DateTime, Utc};
use platforms_status::StreamInfo;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::handles::PlatformHandles;

/// Stable entity identifier. Generated once, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Last committed aggregate status. Stream info exists only while online.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stream_info", rename_all = "lowercase")]
pub enum ResolvedStatus {
    #[default]
    Offline,
    Online(StreamInfo),
}

impl ResolvedStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, ResolvedStatus::Online(_))
    }

    pub fn stream_info(&self) -> Option<&StreamInfo> {
        match self {
            ResolvedStatus::Online(info) => Some(info),
            ResolvedStatus::Offline => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolvedStatus::Online(_) => "online",
            ResolvedStatus::Offline => "offline",
        }
    }
}

/// One followed channel-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub id: EntityId,
    pub display_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub platform_handles: PlatformHandles,
    #[serde(default)]
    pub status: ResolvedStatus,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub notifications_enabled: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl TrackedEntity {
    /// A fresh entity: offline, not a favorite, notifications off.
    pub fn new(
        display_name: impl Into<String>,
        avatar_url: Option<String>,
        platform_handles: PlatformHandles,
    ) -> Self {
        Self {
            id: EntityId::generate(),
            display_name: display_name.into(),
            avatar_url,
            platform_handles,
            status: ResolvedStatus::Offline,
            is_favorite: false,
            notifications_enabled: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_inert(&self) -> bool {
        self.platform_handles.is_empty()
    }

    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }
}
