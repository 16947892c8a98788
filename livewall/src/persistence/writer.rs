use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ENTITIES_KEY, KeyValueStore, SETTINGS_KEY};
use crate::Result;
use crate::config::Settings;
use crate::domain::Snapshot;

/// Saves committed state in the background.
///
/// Follows the committed snapshot and the settings through their `watch`
/// channels. Bursts of commits coalesce: only the latest state is written.
pub struct PersistenceWriter {
    store: Arc<dyn KeyValueStore>,
    entities: watch::Receiver<Arc<Snapshot>>,
    settings: watch::Receiver<Settings>,
    cancel: CancellationToken,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceWriter {
    /// Start the writer. Must be called from within a tokio runtime.
    ///
    /// The receivers' current values count as already saved; every change
    /// published after they were subscribed is written.
    pub fn spawn(
        store: Arc<dyn KeyValueStore>,
        entities: watch::Receiver<Arc<Snapshot>>,
        settings: watch::Receiver<Settings>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_writer(
            store.clone(),
            entities.clone(),
            settings.clone(),
            cancel.clone(),
        ));

        Self {
            store,
            entities,
            settings,
            cancel,
            task: parking_lot::Mutex::new(Some(task)),
        }
    }

    /// Write the current state right away.
    pub async fn flush(&self) -> Result<()> {
        let snapshot = self.entities.borrow().clone();
        let settings = self.settings.borrow().clone();
        save_entities(self.store.as_ref(), &snapshot).await?;
        save_settings(self.store.as_ref(), &settings).await
    }

    /// Stop the background task and write the final state.
    pub async fn shutdown(&self) -> Result<()> {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            warn!("persistence writer task failed: {}", e);
        }
        self.flush().await?;
        info!("persistence flushed");
        Ok(())
    }
}

impl Drop for PersistenceWriter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for PersistenceWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceWriter")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

async fn run_writer(
    store: Arc<dyn KeyValueStore>,
    mut entities: watch::Receiver<Arc<Snapshot>>,
    mut settings: watch::Receiver<Settings>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            changed = entities.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = entities.borrow_and_update().clone();
                if let Err(e) = save_entities(store.as_ref(), &snapshot).await {
                    warn!("failed to save entities: {}", e);
                }
            }
            changed = settings.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = settings.borrow_and_update().clone();
                if let Err(e) = save_settings(store.as_ref(), &current).await {
                    warn!("failed to save settings: {}", e);
                }
            }
        }
    }

    debug!("persistence writer stopped");
}

async fn save_entities(store: &dyn KeyValueStore, snapshot: &Snapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot.entities())?;
    store.save(ENTITIES_KEY, &json).await?;
    debug!(revision = snapshot.revision(), "saved entities");
    Ok(())
}

async fn save_settings(store: &dyn KeyValueStore, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    store.save(SETTINGS_KEY, &json).await
}
