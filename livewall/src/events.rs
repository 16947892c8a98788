//! Application events.
//!
//! Events are broadcast to any number of listeners (UI, logging, tests).
//! Publishing never blocks and never fails the caller when nobody listens.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::EntityId;
use platforms_status::StreamInfo;

/// Summary of one completed polling tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Entities evaluated this tick (inert ones included).
    pub evaluated: usize,
    pub online: usize,
    pub offline: usize,
    /// Entities whose status could not be determined and was retained.
    pub unknown: usize,
    pub went_online: usize,
    pub went_offline: usize,
    /// Notifications dispatched.
    pub notified: usize,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

/// Events emitted by the engine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A new snapshot was committed.
    SnapshotCommitted { revision: u64 },
    /// An entity transitioned offline to online.
    EntityOnline {
        entity_id: EntityId,
        display_name: String,
        info: StreamInfo,
        timestamp: DateTime<Utc>,
    },
    /// An entity transitioned online to offline.
    EntityOffline {
        entity_id: EntityId,
        display_name: String,
        timestamp: DateTime<Utc>,
    },
    TickCompleted(TickReport),
    /// Entities removed from the watch set, oldest first.
    ViewersClosed { closed: Vec<EntityId> },
    SchedulerStateChanged { running: bool },
}

impl AppEvent {
    /// A short human-readable description.
    pub fn description(&self) -> String {
        match self {
            AppEvent::SnapshotCommitted { revision } => format!("snapshot {} committed", revision),
            AppEvent::EntityOnline {
                display_name, info, ..
            } => format!("{} is now live: {}", display_name, info.title),
            AppEvent::EntityOffline { display_name, .. } => {
                format!("{} went offline", display_name)
            }
            AppEvent::TickCompleted(report) => format!(
                "tick: {} evaluated, {} online, {} unknown",
                report.evaluated, report.online, report.unknown
            ),
            AppEvent::ViewersClosed { closed } => {
                format!("{} viewer(s) closed to make room", closed.len())
            }
            AppEvent::SchedulerStateChanged { running } => {
                format!("polling {}", if *running { "started" } else { "stopped" })
            }
        }
    }
}

/// Broadcaster for application events.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBroadcaster {
    /// Create a new broadcaster with default capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Returns the number of receivers it reached.
    pub fn publish(&self, event: AppEvent) -> usize {
        match self.sender.send(event) {
            Ok(count) => count,
            Err(err) => {
                trace!("no subscribers for event: {}", err.0.description());
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
