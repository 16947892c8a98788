//! livewall library crate.
//!
//! Tracks a set of channels across several streaming platforms, keeps their
//! aggregate live status current, notifies on offline to online transitions,
//! and manages the bounded set of channels being watched.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod monitor;
pub mod notification;
pub mod persistence;
pub mod scheduler;

pub use engine::{Engine, EngineOptions};
pub use error::{Error, Result};
