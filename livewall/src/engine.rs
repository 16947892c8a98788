//! The engine facade.
//!
//! Wires the entity store, watch set, settings, status monitor, polling
//! scheduler and persistence together, and exposes the user actions. All
//! mutators are synchronous: their effect on state is immediate, while
//! network work and notification delivery happen in the background.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use platforms_status::{ChannelProfile, ProviderRegistry};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Settings, SettingsHandle};
use crate::domain::{
    AddOutcome, EntityId, EntityStore, PlatformHandles, Snapshot, TrackedEntity, WatchSet,
};
use crate::events::{AppEvent, EventBroadcaster, TickReport};
use crate::monitor::{PriorityResolver, StatusMonitor};
use crate::notification::{NotificationChannel, NotificationDispatcher};
use crate::persistence::{KeyValueStore, PersistenceWriter, load_state};
use crate::scheduler::PollingScheduler;
use crate::{Error, Result};

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Delay before the bootstrap evaluation when polling starts.
    pub settle_delay: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(1500),
        }
    }
}

pub struct Engine {
    registry: Arc<ProviderRegistry>,
    store: Arc<EntityStore>,
    watch_set: Mutex<WatchSet>,
    settings: SettingsHandle,
    events: EventBroadcaster,
    monitor: Arc<StatusMonitor>,
    scheduler: PollingScheduler,
    writer: PersistenceWriter,
    cancel: CancellationToken,
    /// Token for manual ticks, replaced whenever polling is switched off.
    session: Mutex<CancellationToken>,
}

impl Engine {
    /// Restore state from `kv` and build an idle engine.
    ///
    /// Polling does not begin until [`Engine::start`] is called. Must be
    /// called from within a tokio runtime.
    pub async fn load(
        registry: Arc<ProviderRegistry>,
        kv: Arc<dyn KeyValueStore>,
        channels: Vec<Arc<dyn NotificationChannel>>,
        options: EngineOptions,
    ) -> Result<Self> {
        let state = load_state(kv.as_ref()).await;
        info!(
            entities = state.entities.len(),
            interval_secs = state.settings.polling.interval_secs,
            "engine state loaded"
        );

        let settings = SettingsHandle::new(state.settings);
        let has_entities = !state.entities.is_empty();
        let store = Arc::new(EntityStore::new(state.entities));
        let watch_set = WatchSet::new(settings.get().max_viewers)?;
        let events = EventBroadcaster::new();

        let monitor = Arc::new(StatusMonitor::new(
            PriorityResolver::new(registry.clone()),
            store.clone(),
            settings.clone(),
            NotificationDispatcher::new(channels, settings.clone()),
            events.clone(),
        ));
        let scheduler = PollingScheduler::new(
            monitor.clone(),
            settings.polling(),
            options.settle_delay,
            events.clone(),
        )?;
        scheduler.set_has_entities(has_entities);

        let cancel = CancellationToken::new();
        let session = Mutex::new(cancel.child_token());
        let writer = PersistenceWriter::spawn(kv, store.subscribe(), settings.subscribe());

        Ok(Self {
            registry,
            store,
            watch_set: Mutex::new(watch_set),
            settings,
            events,
            monitor,
            scheduler,
            writer,
            cancel,
            session,
        })
    }

    /// Begin polling (if enabled and entities exist).
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Stop polling, cancel in-flight work and flush state to storage.
    pub async fn shutdown(&self) -> Result<()> {
        info!("engine shutting down");
        self.scheduler.stop();
        self.cancel.cancel();
        self.monitor.fence();
        self.writer.shutdown().await
    }

    // Reads

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.store.snapshot()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.store.subscribe()
    }

    pub fn watch_set(&self) -> Vec<EntityId> {
        self.watch_set.lock().to_vec()
    }

    pub fn settings(&self) -> Settings {
        self.settings.get()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Run one evaluation pass now, outside the timer.
    ///
    /// Returns `None` if a tick is already running, the engine is shut down,
    /// or polling was switched off before the tick could commit.
    pub async fn refresh_now(&self) -> Option<TickReport> {
        if self.cancel.is_cancelled() {
            return None;
        }
        let session = self.session.lock().clone();
        self.monitor.run_tick(&session).await
    }

    // Entities

    /// Track a new entity. Its name and avatar come from the priority
    /// platform's profile, or from the handle if that lookup fails.
    pub async fn create_entity(&self, handles: PlatformHandles) -> Result<TrackedEntity> {
        let Some((platform, handle)) = handles.priority() else {
            return Err(Error::validation(
                "an entity needs at least one platform handle",
            ));
        };

        let profile = match self.registry.profile(platform, handle).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(%platform, handle, "profile lookup failed, using handle: {}", e);
                ChannelProfile::from_handle(handle)
            }
        };

        let entity = TrackedEntity::new(profile.display_name, profile.avatar_url, handles);
        self.store.insert(entity.clone())?;
        info!(entity = %entity.id, "tracking {}", entity.display_name);

        self.committed();
        self.sync_has_entities();
        Ok(entity)
    }

    /// Stop tracking an entity. It also leaves the watch set.
    pub fn remove_entity(&self, id: &EntityId) -> Result<TrackedEntity> {
        let removed = self.store.remove(id)?;
        self.watch_set.lock().remove(id);
        info!(entity = %id, "stopped tracking {}", removed.display_name);

        self.committed();
        self.sync_has_entities();
        Ok(removed)
    }

    /// Replace an entity's platform handles. Its status is left to the next tick.
    pub fn update_handles(&self, id: &EntityId, handles: PlatformHandles) -> Result<()> {
        self.store
            .update_entity(id, |entity| entity.platform_handles = handles)?;
        self.committed();
        Ok(())
    }

    /// Returns the new favorite flag.
    pub fn toggle_favorite(&self, id: &EntityId) -> Result<bool> {
        let favorite = self.store.update_entity(id, |entity| {
            entity.is_favorite = !entity.is_favorite;
            entity.is_favorite
        })?;
        self.committed();
        Ok(favorite)
    }

    /// Returns the new per-entity notification flag.
    pub fn toggle_notifications(&self, id: &EntityId) -> Result<bool> {
        let enabled = self.store.update_entity(id, |entity| {
            entity.notifications_enabled = !entity.notifications_enabled;
            entity.notifications_enabled
        })?;
        self.committed();
        Ok(enabled)
    }

    // Watch set

    pub fn add_to_watch(&self, id: &EntityId) -> Result<AddOutcome> {
        let mut watch_set = self.watch_set.lock();
        if !self.store.snapshot().contains(id) {
            return Err(Error::not_found("TrackedEntity", id.as_str()));
        }
        let outcome = watch_set.add(id.clone());
        if let AddOutcome::AddedWithEviction(evicted) = &outcome {
            info!(entity = %id, evicted = %evicted, "watch set full, closed oldest viewer");
        }
        Ok(outcome)
    }

    /// Returns whether `id` was being watched.
    pub fn remove_from_watch(&self, id: &EntityId) -> bool {
        self.watch_set.lock().remove(id)
    }

    /// Change the watch set capacity. Returns the viewers closed to fit,
    /// oldest first, and announces them with [`AppEvent::ViewersClosed`].
    pub fn set_max_viewers(&self, max_viewers: usize) -> Result<Vec<EntityId>> {
        let mut watch_set = self.watch_set.lock();
        let closed = watch_set.set_capacity(max_viewers)?;
        self.settings.update(|s| s.max_viewers = max_viewers)?;

        if !closed.is_empty() {
            info!(closed = closed.len(), max_viewers, "closed viewers to fit new limit");
            self.events.publish(AppEvent::ViewersClosed {
                closed: closed.clone(),
            });
        }
        Ok(closed)
    }

    // Settings

    pub fn set_polling_enabled(&self, enabled: bool) -> Result<()> {
        self.settings.update(|s| s.polling.enabled = enabled)?;
        self.scheduler.set_enabled(enabled);
        if !enabled {
            self.cancel_manual_ticks();
        }
        Ok(())
    }

    pub fn set_polling_interval(&self, interval_secs: u64) -> Result<()> {
        self.settings
            .update(|s| s.polling.interval_secs = interval_secs)?;
        self.scheduler.set_interval(interval_secs)
    }

    pub fn set_notifications_enabled(&self, enabled: bool) -> Result<()> {
        self.settings
            .update(|s| s.notifications.enabled = enabled)
            .map(|_| ())
    }

    pub fn set_favorites_only(&self, favorites_only: bool) -> Result<()> {
        self.settings
            .update(|s| s.notifications.favorites_only = favorites_only)
            .map(|_| ())
    }

    pub fn set_desktop_notifications(&self, enabled: bool) -> Result<()> {
        self.settings
            .update(|s| s.notifications.desktop = enabled)
            .map(|_| ())
    }

    pub fn set_sound_notifications(&self, enabled: bool) -> Result<()> {
        self.settings
            .update(|s| s.notifications.sound = enabled)
            .map(|_| ())
    }

    fn sync_has_entities(&self) {
        self.scheduler
            .update_has_entities(|| !self.store.snapshot().is_empty());
    }

    /// Cancel manual ticks still in flight; none commits or notifies after this.
    fn cancel_manual_ticks(&self) {
        let previous = std::mem::replace(&mut *self.session.lock(), self.cancel.child_token());
        previous.cancel();
        self.monitor.fence();
    }

    fn committed(&self) {
        self.events.publish(AppEvent::SnapshotCommitted {
            revision: self.store.snapshot().revision(),
        });
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("entities", &self.store.snapshot().len())
            .field("watch_set", &self.watch_set.lock().len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}
