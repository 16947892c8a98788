use tracing::{debug, warn};

use super::{ENTITIES_KEY, KeyValueStore, SETTINGS_KEY};
use crate::config::Settings;
use crate::domain::TrackedEntity;

/// Everything restored at startup.
#[derive(Debug, Clone, Default)]
pub struct PersistedState {
    pub entities: Vec<TrackedEntity>,
    pub settings: Settings,
}

/// Load persisted state.
///
/// Missing keys yield defaults. Unreadable, malformed or invalid documents
/// are logged and replaced by defaults rather than failing startup.
pub async fn load_state(store: &dyn KeyValueStore) -> PersistedState {
    let settings = match load_json::<Settings>(store, SETTINGS_KEY).await {
        Some(settings) => match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                warn!("stored settings are invalid, using defaults: {}", e);
                Settings::default()
            }
        },
        None => Settings::default(),
    };

    let mut entities = load_json::<Vec<TrackedEntity>>(store, ENTITIES_KEY)
        .await
        .unwrap_or_default();

    let before = entities.len();
    let mut seen = std::collections::HashSet::new();
    entities.retain(|e| seen.insert(e.id.clone()));
    if entities.len() != before {
        warn!(
            "dropped {} stored entities with duplicate ids",
            before - entities.len()
        );
    }

    debug!(entities = entities.len(), "loaded persisted state");
    PersistedState { entities, settings }
}

async fn load_json<T: serde::de::DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Option<T> {
    let raw = match store.load(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, "failed to read stored state: {}", e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, "stored state is malformed, ignoring: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[tokio::test]
    async fn test_empty_store_yields_defaults() {
        let state = load_state(&MemoryStore::new()).await;
        assert!(state.entities.is_empty());
        assert_eq!(state.settings, Settings::default());
    }

    #[tokio::test]
    async fn test_malformed_documents_yield_defaults() {
        let store = MemoryStore::with_values([
            (ENTITIES_KEY, "not json"),
            (SETTINGS_KEY, r#"{"max_viewers":0}"#),
        ]);
        let state = load_state(&store).await;
        assert!(state.entities.is_empty());
        assert_eq!(state.settings.max_viewers, Settings::DEFAULT_MAX_VIEWERS);
    }

    #[tokio::test]
    async fn test_loads_entities() {
        let raw = r#"[{
            "id": "a",
            "display_name": "Alice",
            "platform_handles": {"kick": "alice"},
            "is_favorite": true
        }]"#;
        let store = MemoryStore::with_values([(ENTITIES_KEY, raw)]);

        let state = load_state(&store).await;
        assert_eq!(state.entities.len(), 1);
        let alice = &state.entities[0];
        assert_eq!(alice.display_name, "Alice");
        assert!(alice.is_favorite);
        assert!(!alice.is_online());
    }
}
