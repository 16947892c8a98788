//! Notification delivery.
//!
//! The monitor decides *whether* to notify; this module only delivers.
//! Delivery is fire-and-forget: every enabled channel gets the notification
//! in its own task, failures are logged and never retried.

pub mod channels;
mod dispatcher;
mod event;

pub use channels::{ChannelKind, NotificationChannel};
pub use dispatcher::NotificationDispatcher;
pub use event::LiveNotification;
