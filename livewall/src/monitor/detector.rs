//! Transition detection.
//!
//! Decisions are made against the pre-tick snapshot only, so one entity's
//! result can never influence another's decision within the same tick.

use crate::config::NotificationSettings;
use crate::domain::{EntityId, ResolvedStatus, TrackedEntity};

use super::Resolution;

/// Change in committed status across one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentOnline,
    WentOffline,
    StayedOnline,
    StayedOffline,
}

impl Transition {
    pub fn between(previous: &ResolvedStatus, next: &ResolvedStatus) -> Self {
        match (previous.is_online(), next.is_online()) {
            (false, true) => Transition::WentOnline,
            (true, false) => Transition::WentOffline,
            (true, true) => Transition::StayedOnline,
            (false, false) => Transition::StayedOffline,
        }
    }

    /// Only offline to online edges can notify.
    pub fn is_notify_eligible(&self) -> bool {
        matches!(self, Transition::WentOnline)
    }
}

/// Global notification switches, captured once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationGate {
    pub enabled: bool,
    pub favorites_only: bool,
}

impl NotificationGate {
    /// Whether a notify-eligible transition of `entity` may notify.
    pub fn allows(&self, entity: &TrackedEntity) -> bool {
        entity.notifications_enabled
            && self.enabled
            && (!self.favorites_only || entity.is_favorite)
    }
}

impl From<&NotificationSettings> for NotificationGate {
    fn from(settings: &NotificationSettings) -> Self {
        Self {
            enabled: settings.enabled,
            favorites_only: settings.favorites_only,
        }
    }
}

/// What the tick will do with one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub id: EntityId,
    /// Status to commit.
    pub next: ResolvedStatus,
    pub transition: Transition,
    /// The resolution was unknown and the previous status was kept.
    pub retained: bool,
    pub notify: bool,
}

/// Decide the next status of `entity` (as of the pre-tick snapshot).
pub fn decide(entity: &TrackedEntity, resolution: &Resolution, gate: &NotificationGate) -> Decision {
    let next = resolution.apply_to(&entity.status);
    let transition = Transition::between(&entity.status, &next);
    let notify = transition.is_notify_eligible() && gate.allows(entity);

    Decision {
        id: entity.id.clone(),
        next,
        transition,
        retained: resolution.is_unknown(),
        notify,
    }
}
