//! Built-in providers, one per platform.

pub mod kick;
pub mod twitch;
pub mod youtube;

pub use kick::Kick;
pub use twitch::Twitch;
pub use youtube::YouTube;
