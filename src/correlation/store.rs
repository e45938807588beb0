//! Concurrent slot map keyed by correlation identifier.
//!
//! # Responsibilities
//! - Hold at most one entry per correlation id
//! - Insert only into vacant slots, handing the candidate back on conflict
//! - Remove entries atomically, optionally only when a predicate holds
//!
//! The store does not resolve the waiter/delivery race on its own; the
//! rendezvous engine composes these single-key steps into that protocol.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::correlation::CorrelationId;

/// Global counter for entry tokens.
static ENTRY_TOKEN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one particular entry, distinct from its correlation id.
///
/// Two entries created for the same id at different times get different
/// tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryToken(u64);

impl EntryToken {
    /// Allocate the next token.
    pub fn next() -> Self {
        Self(ENTRY_TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw token value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Which side of the rendezvous currently owns a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// A request is parked and waiting for its result.
    Waiting,
    /// A result arrived before anyone waited for it.
    Delivered,
}

impl EntryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryState::Waiting => "waiting",
            EntryState::Delivered => "delivered",
        }
    }
}

/// Anything the store can hold.
pub trait Slot {
    fn state(&self) -> EntryState;
    fn token(&self) -> EntryToken;
}

/// Returned by [`CorrelationStore::insert_if_absent`] when the slot is taken.
#[derive(Debug)]
pub struct Occupied<E> {
    /// The candidate that was not inserted.
    pub rejected: E,
    /// State of the entry that holds the slot.
    pub existing: EntryState,
}

/// A thread-safe map from correlation id to pending entry.
pub struct CorrelationStore<E> {
    entries: DashMap<CorrelationId, E>,
}

impl<E: Slot> CorrelationStore<E> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Place `entry` under `id` unless the slot is already occupied.
    pub fn insert_if_absent(&self, id: CorrelationId, entry: E) -> Result<(), Occupied<E>> {
        match self.entries.entry(id) {
            Entry::Occupied(occupied) => Err(Occupied {
                existing: occupied.get().state(),
                rejected: entry,
            }),
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(())
            }
        }
    }

    /// Take and delete the entry for `id`.
    pub fn remove(&self, id: &CorrelationId) -> Option<E> {
        self.entries.remove(id).map(|(_, entry)| entry)
    }

    /// Take and delete the entry for `id` only if `predicate` accepts it.
    ///
    /// The check and the removal happen under the same shard lock.
    pub fn remove_if(&self, id: &CorrelationId, predicate: impl FnOnce(&E) -> bool) -> Option<E> {
        self.entries
            .remove_if(id, |_, entry| predicate(entry))
            .map(|(_, entry)| entry)
    }

    /// Take the entry for `id` if it is in `state`.
    pub fn take(&self, id: &CorrelationId, state: EntryState) -> Option<E> {
        self.remove_if(id, |entry| entry.state() == state)
    }

    /// Take the entry for `id` if it is exactly the entry identified by `token`.
    pub fn take_token(&self, id: &CorrelationId, token: EntryToken) -> Option<E> {
        self.remove_if(id, |entry| entry.token() == token)
    }

    /// Current state of the slot, if occupied.
    pub fn state(&self, id: &CorrelationId) -> Option<EntryState> {
        self.entries.get(id).map(|entry| entry.state())
    }

    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of entries per state as `(waiting, delivered)`.
    pub fn summary(&self) -> (usize, usize) {
        let mut waiting = 0;
        let mut delivered = 0;
        for entry in self.entries.iter() {
            match entry.value().state() {
                EntryState::Waiting => waiting += 1,
                EntryState::Delivered => delivered += 1,
            }
        }
        (waiting, delivered)
    }
}

impl<E: Slot> Default for CorrelationStore<E> {
    fn default() -> Self {
        Self::new()
    }
}
