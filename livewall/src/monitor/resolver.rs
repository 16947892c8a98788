//! Priority resolution.
//!
//! The highest-precedence configured platform is queried first. Only when it
//! does not report online are the remaining platforms scanned, in precedence
//! order, stopping at the first one that is live.

use std::sync::Arc;

use platforms_status::{ChannelStatus, ProviderRegistry, StreamInfo};
use tracing::{debug, warn};

use crate::domain::{EntityId, PlatformHandles, ResolutionPlan, ResolvedStatus, Target};

/// Outcome of resolving one entity for one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A platform answered online; the earliest in precedence wins.
    Online(StreamInfo),
    /// Every configured platform explicitly answered offline, or none is configured.
    Offline,
    /// Nothing answered online and at least one platform could not be queried.
    Unknown,
}

impl Resolution {
    /// The status to commit given the previously committed one.
    ///
    /// `Unknown` keeps the previous status: a failed query must never flip a
    /// live entity to offline.
    pub fn apply_to(&self, previous: &ResolvedStatus) -> ResolvedStatus {
        match self {
            Resolution::Online(info) => ResolvedStatus::Online(info.clone()),
            Resolution::Offline => ResolvedStatus::Offline,
            Resolution::Unknown => previous.clone(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Resolution::Unknown)
    }
}

/// Resolves entities against a provider registry.
#[derive(Debug, Clone)]
pub struct PriorityResolver {
    registry: Arc<ProviderRegistry>,
}

impl PriorityResolver {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Resolve the aggregate status for `handles`.
    ///
    /// Provider errors are logged and folded into [`Resolution::Unknown`];
    /// they never escape this function.
    pub async fn resolve(&self, id: &EntityId, handles: &PlatformHandles) -> Resolution {
        let (priority, fallbacks) = match handles.plan() {
            ResolutionPlan::Inert => return Resolution::Offline,
            ResolutionPlan::Resolvable {
                priority,
                fallbacks,
            } => (priority, fallbacks),
        };

        let mut errored = false;
        for target in std::iter::once(priority).chain(fallbacks) {
            match self.query(id, &target).await {
                Some(ChannelStatus::Online(info)) => return Resolution::Online(info),
                Some(ChannelStatus::Offline) => {}
                None => errored = true,
            }
        }

        if errored {
            Resolution::Unknown
        } else {
            Resolution::Offline
        }
    }

    async fn query(&self, id: &EntityId, target: &Target) -> Option<ChannelStatus> {
        match self.registry.query(target.platform, &target.handle).await {
            Ok(status) => {
                debug!(
                    entity = %id,
                    platform = %target.platform,
                    handle = %target.handle,
                    online = status.is_online(),
                    "status query answered"
                );
                Some(status)
            }
            Err(e) => {
                warn!(
                    entity = %id,
                    platform = %target.platform,
                    handle = %target.handle,
                    "status query failed: {}",
                    e
                );
                None
            }
        }
    }
}
