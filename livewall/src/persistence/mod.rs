//! Local persistence.
//!
//! State is kept as opaque JSON blobs under fixed keys in a
//! [`KeyValueStore`]. The engine loads once at startup; afterwards a
//! background [`PersistenceWriter`] saves every committed change.

mod file_store;
mod memory_store;
mod state;
mod writer;

pub use file_store::JsonFileStore;
pub use memory_store::MemoryStore;
pub use state::{PersistedState, load_state};
pub use writer::PersistenceWriter;

use async_trait::async_trait;

use crate::Result;

/// Key holding the tracked entity list.
pub const ENTITIES_KEY: &str = "tracked_entities";
/// Key holding the user settings.
pub const SETTINGS_KEY: &str = "settings";

/// A string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>>;

    async fn save(&self, key: &str, value: &str) -> Result<()>;
}
