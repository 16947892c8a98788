//! The polling tick.
//!
//! A tick captures the committed snapshot, resolves every entity in it
//! concurrently, waits for all of them, decides transitions and notifications
//! against the captured snapshot, and only then commits. Ticks never overlap;
//! a tick that finds another one in flight is skipped.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SettingsHandle;
use crate::domain::EntityStore;
use crate::events::{AppEvent, EventBroadcaster, TickReport};
use crate::notification::{LiveNotification, NotificationDispatcher};

use super::{Decision, NotificationGate, PriorityResolver, Transition, decide};

pub struct StatusMonitor {
    resolver: PriorityResolver,
    store: Arc<EntityStore>,
    settings: SettingsHandle,
    dispatcher: NotificationDispatcher,
    events: EventBroadcaster,
    /// Held for the whole tick.
    tick_lock: tokio::sync::Mutex<()>,
    /// Held while a tick commits and hands notifications off.
    commit_gate: Mutex<()>,
}

impl StatusMonitor {
    pub fn new(
        resolver: PriorityResolver,
        store: Arc<EntityStore>,
        settings: SettingsHandle,
        dispatcher: NotificationDispatcher,
        events: EventBroadcaster,
    ) -> Self {
        Self {
            resolver,
            store,
            settings,
            dispatcher,
            events,
            tick_lock: tokio::sync::Mutex::new(()),
            commit_gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    /// Whether a tick is currently running.
    pub fn is_busy(&self) -> bool {
        self.tick_lock.try_lock().is_err()
    }

    /// Run one evaluation pass over all entities.
    ///
    /// Returns `None` when the tick was skipped because another one is in
    /// flight, or when `cancel` fired before the results were committed. In
    /// both cases nothing is committed and nothing is dispatched.
    pub async fn run_tick(&self, cancel: &CancellationToken) -> Option<TickReport> {
        let Ok(_tick) = self.tick_lock.try_lock() else {
            debug!("previous tick still running; skipping");
            return None;
        };
        let started = Instant::now();

        let before = self.store.snapshot();
        let resolutions = join_all(
            before
                .entities()
                .iter()
                .map(|entity| self.resolver.resolve(&entity.id, &entity.platform_handles)),
        )
        .await;

        if cancel.is_cancelled() {
            debug!("tick cancelled after fan-out");
            return None;
        }

        let gate = NotificationGate::from(&self.settings.notifications());
        let decisions: Vec<Decision> = before
            .entities()
            .iter()
            .zip(&resolutions)
            .map(|(entity, resolution)| decide(entity, resolution, &gate))
            .collect();

        let mut report = TickReport {
            evaluated: decisions.len(),
            ..Default::default()
        };
        for decision in &decisions {
            if decision.retained {
                report.unknown += 1;
            } else if decision.next.is_online() {
                report.online += 1;
            } else {
                report.offline += 1;
            }
        }

        let updates = decisions
            .iter()
            .map(|d| (d.id.clone(), d.next.clone()))
            .collect();

        let (outcome, transitions) = {
            let _commit = self.commit_gate.lock();
            let outcome = self.store.commit_statuses(updates, cancel)?;

            let mut transitions = Vec::new();
            for decision in &decisions {
                if !outcome.applied.contains(&decision.id) {
                    continue;
                }
                let Some(entity) = before.get(&decision.id) else {
                    continue;
                };

                match decision.transition {
                    Transition::WentOnline => {
                        report.went_online += 1;
                        if decision.notify
                            && let Some(info) = decision.next.stream_info()
                        {
                            let notification = LiveNotification::new(
                                entity.id.clone(),
                                entity.display_name.clone(),
                                info.clone(),
                            );
                            self.dispatcher.dispatch(notification);
                            report.notified += 1;
                        }
                    }
                    Transition::WentOffline => report.went_offline += 1,
                    Transition::StayedOnline | Transition::StayedOffline => continue,
                }
                transitions.push((entity.clone(), decision.clone()));
            }
            (outcome, transitions)
        };

        let now = chrono::Utc::now();
        for (entity, decision) in transitions {
            match decision.next.stream_info() {
                Some(info) => {
                    info!(
                        entity = %entity.id,
                        platform = %info.platform,
                        notified = decision.notify,
                        "{} went online: {}",
                        entity.display_name,
                        info.title
                    );
                    self.events.publish(AppEvent::EntityOnline {
                        entity_id: entity.id,
                        display_name: entity.display_name,
                        info: info.clone(),
                        timestamp: now,
                    });
                }
                None => {
                    info!(entity = %entity.id, "{} went offline", entity.display_name);
                    self.events.publish(AppEvent::EntityOffline {
                        entity_id: entity.id,
                        display_name: entity.display_name,
                        timestamp: now,
                    });
                }
            }
        }

        if outcome.revision != before.revision() {
            self.events.publish(AppEvent::SnapshotCommitted {
                revision: outcome.revision,
            });
        }

        report.duration = started.elapsed();
        debug!(
            evaluated = report.evaluated,
            online = report.online,
            unknown = report.unknown,
            notified = report.notified,
            "tick completed in {:?}",
            report.duration
        );
        self.events.publish(AppEvent::TickCompleted(report.clone()));
        Some(report)
    }

    /// Block until any commit in progress has finished.
    ///
    /// After cancelling a tick's token and calling this, the tick can no
    /// longer commit or dispatch.
    pub fn fence(&self) {
        drop(self.commit_gate.lock());
    }
}

impl std::fmt::Debug for StatusMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusMonitor")
            .field("resolver", &self.resolver)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlatformHandles, TrackedEntity};
    use crate::notification::{ChannelKind, NotificationChannel};
    use async_trait::async_trait;
    use platforms_status::{
        ChannelStatus, Platform, ProviderError, ProviderRegistry, StatusProvider, StreamInfo,
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Notify, mpsc};

    /// Per-handle scripted answers; `None` is a provider error.
    #[derive(Default)]
    struct ScriptedProvider {
        answers: Mutex<HashMap<String, Option<ChannelStatus>>>,
        gate: Option<Arc<Notify>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn set(&self, handle: &str, answer: Option<ChannelStatus>) {
            self.answers.lock().insert(handle.to_string(), answer);
        }
    }

    #[async_trait]
    impl StatusProvider for ScriptedProvider {
        fn platform(&self) -> Platform {
            Platform::Twitch
        }

        async fn query(&self, handle: &str) -> Result<ChannelStatus, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let answer = self.answers.lock().get(handle).cloned();
            answer
                .flatten()
                .ok_or_else(|| ProviderError::Other("scripted failure".to_string()))
        }
    }

    struct CountingChannel(mpsc::UnboundedSender<LiveNotification>);

    #[async_trait]
    impl NotificationChannel for CountingChannel {
        fn kind(&self) -> ChannelKind {
            ChannelKind::Toast
        }

        fn is_enabled(&self) -> bool {
            true
        }

        async fn deliver(&self, notification: &LiveNotification) -> crate::Result<()> {
            let _ = self.0.send(notification.clone());
            Ok(())
        }
    }

    struct Harness {
        monitor: Arc<StatusMonitor>,
        provider: Arc<ScriptedProvider>,
        notifications: mpsc::UnboundedReceiver<LiveNotification>,
        settings: SettingsHandle,
    }

    fn harness(entities: Vec<TrackedEntity>, gate: Option<Arc<Notify>>) -> Harness {
        let provider = Arc::new(ScriptedProvider {
            gate,
            ..Default::default()
        });
        let mut registry = ProviderRegistry::new();
        registry.register(provider.clone());

        let settings = SettingsHandle::default();
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher =
            NotificationDispatcher::new(vec![Arc::new(CountingChannel(tx))], settings.clone());
        let monitor = StatusMonitor::new(
            PriorityResolver::new(Arc::new(registry)),
            Arc::new(EntityStore::new(entities)),
            settings.clone(),
            dispatcher,
            EventBroadcaster::new(),
        );

        Harness {
            monitor: Arc::new(monitor),
            provider,
            notifications: rx,
            settings,
        }
    }

    fn tracked(handle: &str) -> TrackedEntity {
        let mut entity = TrackedEntity::new(
            handle,
            None,
            PlatformHandles::new().with(Platform::Twitch, handle),
        );
        entity.notifications_enabled = true;
        entity
    }

    fn live(title: &str, viewers: u64) -> Option<ChannelStatus> {
        Some(ChannelStatus::Online(
            StreamInfo::new(Platform::Twitch, title).with_viewer_count(viewers),
        ))
    }

    #[tokio::test]
    async fn test_single_notification_per_online_period() {
        let entity = tracked("e");
        let mut h = harness(vec![entity.clone()], None);
        let cancel = CancellationToken::new();

        h.provider.set("e", Some(ChannelStatus::Offline));
        let report = h.monitor.run_tick(&cancel).await.unwrap();
        assert_eq!(report.offline, 1);
        assert_eq!(report.notified, 0);

        h.provider.set("e", live("Match", 120));
        let report = h.monitor.run_tick(&cancel).await.unwrap();
        assert_eq!(report.went_online, 1);
        assert_eq!(report.notified, 1);
        let committed = h.monitor.store().snapshot();
        let info = committed.get(&entity.id).unwrap().status.stream_info().unwrap();
        assert_eq!(info.viewer_count, Some(120));
        assert_eq!(info.title, "Match");

        h.provider.set("e", live("Match", 200));
        let report = h.monitor.run_tick(&cancel).await.unwrap();
        assert_eq!(report.went_online, 0);
        assert_eq!(report.notified, 0);
        let committed = h.monitor.store().snapshot();
        assert_eq!(
            committed
                .get(&entity.id)
                .unwrap()
                .status
                .stream_info()
                .unwrap()
                .viewer_count,
            Some(200)
        );

        let first = h.notifications.recv().await.unwrap();
        assert_eq!(first.entity_id, entity.id);
        assert!(h.notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_provider_error_does_not_flip_online_entity() {
        let entity = tracked("e");
        let h = harness(vec![entity.clone()], None);
        let cancel = CancellationToken::new();

        h.provider.set("e", live("Match", 1));
        h.monitor.run_tick(&cancel).await.unwrap();

        h.provider.set("e", None);
        let report = h.monitor.run_tick(&cancel).await.unwrap();
        assert_eq!(report.unknown, 1);
        assert!(h.monitor.store().snapshot().get(&entity.id).unwrap().is_online());
    }

    #[tokio::test]
    async fn test_favorites_only_suppresses_non_favorites() {
        let entity = tracked("e");
        let mut h = harness(vec![entity], None);
        h.settings
            .update(|s| s.notifications.favorites_only = true)
            .unwrap();

        h.provider.set("e", live("Match", 1));
        let report = h.monitor.run_tick(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.went_online, 1);
        assert_eq!(report.notified, 0);
        assert!(h.notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancelled_tick_commits_nothing() {
        let gate = Arc::new(Notify::new());
        let entity = tracked("e");
        let mut h = harness(vec![entity.clone()], Some(gate.clone()));
        h.provider.set("e", live("Match", 1));

        let cancel = CancellationToken::new();
        let tick = {
            let monitor = h.monitor.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { monitor.run_tick(&cancel).await })
        };

        while h.provider.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        cancel.cancel();
        h.monitor.fence();
        gate.notify_waiters();

        assert!(tick.await.unwrap().is_none());
        assert!(!h.monitor.store().snapshot().get(&entity.id).unwrap().is_online());
        assert!(h.notifications.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_overlapping_tick_is_skipped() {
        let gate = Arc::new(Notify::new());
        let h = harness(vec![tracked("e")], Some(gate.clone()));
        h.provider.set("e", Some(ChannelStatus::Offline));

        let first = {
            let monitor = h.monitor.clone();
            tokio::spawn(async move { monitor.run_tick(&CancellationToken::new()).await })
        };
        while h.provider.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert!(h.monitor.is_busy());
        assert!(h.monitor.run_tick(&CancellationToken::new()).await.is_none());

        gate.notify_waiters();
        assert!(first.await.unwrap().is_some());
        assert_eq!(h.provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_entity_removed_mid_tick_is_not_resurrected() {
        let gate = Arc::new(Notify::new());
        let entity = tracked("e");
        let mut h = harness(vec![entity.clone()], Some(gate.clone()));
        h.provider.set("e", live("Match", 1));

        let tick = {
            let monitor = h.monitor.clone();
            tokio::spawn(async move { monitor.run_tick(&CancellationToken::new()).await })
        };
        while h.provider.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        h.monitor.store().remove(&entity.id).unwrap();
        gate.notify_waiters();

        let report = tick.await.unwrap().unwrap();
        assert_eq!(report.notified, 0);
        assert!(h.monitor.store().snapshot().is_empty());
        assert!(h.notifications.try_recv().is_err());
    }
}
