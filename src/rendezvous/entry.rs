//! Pending entries held by the engine's store.

use tokio::sync::oneshot;

use crate::correlation::{EntryState, EntryToken, Slot};
use crate::rendezvous::outcome::Outcome;
use crate::rendezvous::timer::TimeoutTimer;

/// One in-flight correlation id. Absence from the store is the third state.
#[derive(Debug)]
pub enum PendingEntry<T> {
    Waiting(Waiter<T>),
    Delivered(EarlyDelivery<T>),
}

/// A parked request.
#[derive(Debug)]
pub struct Waiter<T> {
    token: EntryToken,
    completion: oneshot::Sender<Outcome<T>>,
    timer: TimeoutTimer,
}

/// A result that arrived before its request was parked.
#[derive(Debug)]
pub struct EarlyDelivery<T> {
    token: EntryToken,
    payload: T,
    timer: TimeoutTimer,
}

impl<T> Waiter<T> {
    pub fn new(token: EntryToken, completion: oneshot::Sender<Outcome<T>>, timer: TimeoutTimer) -> Self {
        Self {
            token,
            completion,
            timer,
        }
    }

    /// Resolve the parked request, releasing the timer.
    ///
    /// Consumes the waiter, so it can only happen once. A receiver that is
    /// already gone is not an error.
    pub fn complete(self, outcome: Outcome<T>) {
        drop(self.timer);
        let _ = self.completion.send(outcome);
    }

    /// Resolve from inside the waiter's own timer task.
    pub(crate) fn expire(self) {
        self.timer.disarm();
        let _ = self.completion.send(Outcome::Accepted);
    }
}

impl<T> EarlyDelivery<T> {
    pub fn new(token: EntryToken, payload: T, timer: TimeoutTimer) -> Self {
        Self {
            token,
            payload,
            timer,
        }
    }

    /// Hand out the payload, releasing the timer.
    pub fn into_payload(self) -> T {
        drop(self.timer);
        self.payload
    }

    /// Drop an unclaimed payload from inside its own timer task.
    pub(crate) fn expire(self) {
        self.timer.disarm();
    }
}

impl<T> PendingEntry<T> {
    pub fn is_waiting(&self) -> bool {
        matches!(self, PendingEntry::Waiting(_))
    }

    pub fn into_waiter(self) -> Option<Waiter<T>> {
        match self {
            PendingEntry::Waiting(waiter) => Some(waiter),
            PendingEntry::Delivered(_) => None,
        }
    }

    pub fn into_delivery(self) -> Option<EarlyDelivery<T>> {
        match self {
            PendingEntry::Delivered(early) => Some(early),
            PendingEntry::Waiting(_) => None,
        }
    }
}

impl<T> Slot for PendingEntry<T> {
    fn state(&self) -> EntryState {
        match self {
            PendingEntry::Waiting(_) => EntryState::Waiting,
            PendingEntry::Delivered(_) => EntryState::Delivered,
        }
    }

    fn token(&self) -> EntryToken {
        match self {
            PendingEntry::Waiting(waiter) => waiter.token,
            PendingEntry::Delivered(early) => early.token,
        }
    }
}
