//! Bounded, insertion-ordered set of entities currently being watched.

use std::collections::VecDeque;

use crate::{Error, Result};

use super::entity::EntityId;

/// Result of [`WatchSet::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    AlreadyPresent,
    Added,
    /// The set was full; the oldest member was closed to make room.
    AddedWithEviction(EntityId),
}

/// Watch slots with FIFO eviction.
///
/// Members are kept oldest first. `len() <= capacity()` holds after every
/// operation. Eviction only looks at insertion order.
#[derive(Debug, Clone)]
pub struct WatchSet {
    members: VecDeque<EntityId>,
    capacity: usize,
}

impl WatchSet {
    pub fn new(capacity: usize) -> Result<Self> {
        validate_capacity(capacity)?;
        Ok(Self {
            members: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.members.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.members.iter()
    }

    pub fn to_vec(&self) -> Vec<EntityId> {
        self.members.iter().cloned().collect()
    }

    pub fn add(&mut self, id: EntityId) -> AddOutcome {
        if self.contains(&id) {
            return AddOutcome::AlreadyPresent;
        }

        let evicted = if self.members.len() >= self.capacity {
            self.members.pop_front()
        } else {
            None
        };
        self.members.push_back(id);
        self.check_invariant();

        match evicted {
            Some(oldest) => AddOutcome::AddedWithEviction(oldest),
            None => AddOutcome::Added,
        }
    }

    pub fn remove(&mut self, id: &EntityId) -> bool {
        match self.members.iter().position(|m| m == id) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    /// Change the capacity, closing the oldest members that no longer fit.
    ///
    /// Returns the closed members, oldest first.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<Vec<EntityId>> {
        validate_capacity(capacity)?;
        self.capacity = capacity;

        let excess = self.members.len().saturating_sub(capacity);
        let evicted = self.members.drain(..excess).collect();
        self.check_invariant();
        Ok(evicted)
    }

    fn check_invariant(&self) {
        debug_assert!(
            self.members.len() <= self.capacity,
            "watch set holds {} members with capacity {}",
            self.members.len(),
            self.capacity
        );
    }
}

fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(Error::validation("watch capacity must be at least 1"));
    }
    Ok(())
}
