//! Polling scheduler.
//!
//! Owns the single polling timer. The timer runs only while polling is
//! enabled and at least one entity is tracked; every configuration change
//! tears the current timer down before a replacement is armed.

mod service;

pub use service::PollingScheduler;
