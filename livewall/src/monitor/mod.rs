//! Status monitoring.
//!
//! - Priority resolution of an entity's live status across its platforms
//! - Transition detection and the notification gate
//! - The tick: fan-out, decide, then commit

mod detector;
mod resolver;
mod service;

pub use detector::{Decision, NotificationGate, Transition, decide};
pub use resolver::{PriorityResolver, Resolution};
pub use service::StatusMonitor;
