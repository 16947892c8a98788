//! Per-entity platform handles and the resolution plan derived from them.

use std::collections::BTreeMap;

use platforms_status::Platform;
use serde::{Deserialize, Serialize};

/// Mapping from platform to channel handle.
///
/// Blank handles are never stored, so "not configured" has exactly one
/// encoding: the key is absent. Iteration follows platform precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Platform, String>", into = "BTreeMap<Platform, String>")]
pub struct PlatformHandles(BTreeMap<Platform, String>);

impl PlatformHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handle for `platform`. A blank handle clears it.
    pub fn set(&mut self, platform: Platform, handle: impl AsRef<str>) {
        let handle = handle.as_ref().trim();
        if handle.is_empty() {
            self.0.remove(&platform);
        } else {
            self.0.insert(platform, handle.to_string());
        }
    }

    pub fn with(mut self, platform: Platform, handle: impl AsRef<str>) -> Self {
        self.set(platform, handle);
        self
    }

    pub fn remove(&mut self, platform: Platform) -> Option<String> {
        self.0.remove(&platform)
    }

    pub fn get(&self, platform: Platform) -> Option<&str> {
        self.0.get(&platform).map(String::as_str)
    }

    /// Configured `(platform, handle)` pairs in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = (Platform, &str)> {
        self.0.iter().map(|(p, h)| (*p, h.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// An entity without any configured platform can never be resolved.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The highest-precedence configured platform.
    pub fn priority(&self) -> Option<(Platform, &str)> {
        self.iter().next()
    }

    pub fn plan(&self) -> ResolutionPlan {
        let mut targets = self.iter().map(|(platform, handle)| Target {
            platform,
            handle: handle.to_string(),
        });

        match targets.next() {
            None => ResolutionPlan::Inert,
            Some(priority) => ResolutionPlan::Resolvable {
                priority,
                fallbacks: targets.collect(),
            },
        }
    }
}

impl From<BTreeMap<Platform, String>> for PlatformHandles {
    fn from(map: BTreeMap<Platform, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<PlatformHandles> for BTreeMap<Platform, String> {
    fn from(handles: PlatformHandles) -> Self {
        handles.0
    }
}

impl<S: AsRef<str>> FromIterator<(Platform, S)> for PlatformHandles {
    fn from_iter<I: IntoIterator<Item = (Platform, S)>>(iter: I) -> Self {
        let mut handles = Self::new();
        for (platform, handle) in iter {
            handles.set(platform, handle);
        }
        handles
    }
}

/// One platform query the resolver may perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub platform: Platform,
    pub handle: String,
}

/// How an entity's live status is determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPlan {
    /// No platform configured; always offline.
    Inert,
    /// Query `priority` first, then `fallbacks` in precedence order.
    Resolvable {
        priority: Target,
        fallbacks: Vec<Target>,
    },
}
