//! Committed entity snapshots.
//!
//! The store publishes immutable [`Snapshot`]s through a `watch` channel.
//! Every mutation copies the current entity list, edits the copy and swaps it
//! in under a single writer lock, so readers only ever observe fully
//! committed states.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::{Error, Result};

use super::entity::{EntityId, ResolvedStatus, TrackedEntity};

/// An immutable view of all tracked entities.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    revision: u64,
    entities: Vec<TrackedEntity>,
}

impl Snapshot {
    /// Incremented on every committed change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn entities(&self) -> &[TrackedEntity] {
        &self.entities
    }

    pub fn get(&self, id: &EntityId) -> Option<&TrackedEntity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn online_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_online()).count()
    }
}

/// Result of committing a tick.
#[derive(Debug, Clone, Default)]
pub struct CommitOutcome {
    pub revision: u64,
    /// Entities whose committed status was written (still present at commit).
    pub applied: HashSet<EntityId>,
}

/// Single-writer holder of the committed entity list.
#[derive(Debug)]
pub struct EntityStore {
    tx: watch::Sender<Arc<Snapshot>>,
    write_lock: Mutex<()>,
}

impl EntityStore {
    pub fn new(entities: Vec<TrackedEntity>) -> Self {
        let (tx, _) = watch::channel(Arc::new(Snapshot {
            revision: 0,
            entities,
        }));
        Self {
            tx,
            write_lock: Mutex::new(()),
        }
    }

    /// The latest committed snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    /// Receive every newly committed snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.tx.subscribe()
    }

    /// Apply `f` to a copy of the entity list and publish it if `f` succeeds.
    pub fn write<R>(&self, f: impl FnOnce(&mut Vec<TrackedEntity>) -> Result<R>) -> Result<R> {
        let _guard = self.write_lock.lock();
        let current = self.snapshot();

        let mut entities = current.entities.clone();
        let result = f(&mut entities)?;
        self.publish(current.revision, entities);
        Ok(result)
    }

    /// Mutate a single entity by id.
    pub fn update_entity<R>(
        &self,
        id: &EntityId,
        f: impl FnOnce(&mut TrackedEntity) -> R,
    ) -> Result<R> {
        self.write(|entities| {
            let entity = entities
                .iter_mut()
                .find(|e| &e.id == id)
                .ok_or_else(|| Error::not_found("TrackedEntity", id.as_str()))?;
            Ok(f(entity))
        })
    }

    pub fn insert(&self, entity: TrackedEntity) -> Result<()> {
        self.write(|entities| {
            if entities.iter().any(|e| e.id == entity.id) {
                return Err(Error::validation(format!(
                    "entity {} already exists",
                    entity.id
                )));
            }
            entities.push(entity);
            Ok(())
        })
    }

    pub fn remove(&self, id: &EntityId) -> Result<TrackedEntity> {
        self.write(|entities| {
            let index = entities
                .iter()
                .position(|e| &e.id == id)
                .ok_or_else(|| Error::not_found("TrackedEntity", id.as_str()))?;
            Ok(entities.remove(index))
        })
    }

    /// Commit resolved statuses from a tick.
    ///
    /// Updates for entities removed since the tick started are dropped, and
    /// entities added since are left alone. Returns `None` without touching
    /// anything when `cancel` has fired.
    pub fn commit_statuses(
        &self,
        updates: Vec<(EntityId, ResolvedStatus)>,
        cancel: &CancellationToken,
    ) -> Option<CommitOutcome> {
        let _guard = self.write_lock.lock();
        if cancel.is_cancelled() {
            debug!("tick cancelled before commit; discarding results");
            return None;
        }

        let current = self.snapshot();
        let mut updates: HashMap<EntityId, ResolvedStatus> = updates.into_iter().collect();
        let mut entities = current.entities.clone();
        let mut applied = HashSet::new();
        let mut changed = false;

        for entity in entities.iter_mut() {
            if let Some(status) = updates.remove(&entity.id) {
                if entity.status != status {
                    entity.status = status;
                    changed = true;
                }
                applied.insert(entity.id.clone());
            }
        }

        if !updates.is_empty() {
            trace!(dropped = updates.len(), "dropped updates for removed entities");
        }

        let revision = if changed {
            self.publish(current.revision, entities)
        } else {
            current.revision
        };

        Some(CommitOutcome { revision, applied })
    }

    /// Wait for any in-progress write to finish.
    pub fn fence(&self) {
        drop(self.write_lock.lock());
    }

    fn publish(&self, previous: u64, entities: Vec<TrackedEntity>) -> u64 {
        let revision = previous + 1;
        self.tx.send_replace(Arc::new(Snapshot { revision, entities }));
        trace!(revision, "published snapshot");
        revision
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
