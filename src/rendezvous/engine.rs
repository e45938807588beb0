//! The rendezvous engine.
//!
//! # Protocol
//! ```text
//! await_result(id)                         deliver_result(id, payload)
//!   arm timer, build Waiting                 take Waiting?
//!   insert_if_absent ──┐                       yes → complete(Delivered) ✔
//!     ok → park        │                       no  → arm timer, build Delivered
//!     Delivered → take │                             insert_if_absent
//!       ok  → return   │                               ok → Stored
//!       gone → retry   │                               Delivered → Duplicate
//!     Waiting → Accepted                               Waiting → retry
//!
//! timeout(id, token)         → take entry with token; Waiting → Accepted
//! cancellation(id, token)    → take Waiting with token → Aborted
//! ```
//!
//! Each step is one atomic single-key store operation. A retry in either
//! loop happens only because another flow changed the slot in between, so
//! the number of iterations is bounded by the number of concurrent writers
//! for that id.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::config::RendezvousConfig;
use crate::correlation::{CorrelationId, CorrelationStore, EntryState, EntryToken, Occupied, Slot};
use crate::observability::metrics;
use crate::rendezvous::context::ClientContext;
use crate::rendezvous::entry::{EarlyDelivery, PendingEntry, Waiter};
use crate::rendezvous::outcome::{DeliveryOutcome, Outcome};
use crate::rendezvous::timer::TimeoutTimer;

type Store<T> = CorrelationStore<PendingEntry<T>>;

/// Matches parked requests with asynchronously delivered results.
///
/// Cloning is cheap; clones share the same store.
pub struct RendezvousEngine<T> {
    store: Arc<Store<T>>,
    timeout: Duration,
}

impl<T> Clone for RendezvousEngine<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<T> std::fmt::Debug for RendezvousEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendezvousEngine")
            .field("timeout", &self.timeout)
            .field("pending", &self.store.len())
            .finish()
    }
}

impl<T: Send + Sync + 'static> RendezvousEngine<T> {
    /// Create an engine with a uniform timeout for every id.
    pub fn new(timeout: Duration) -> Self {
        Self {
            store: Arc::new(CorrelationStore::new()),
            timeout,
        }
    }

    pub fn from_config(config: &RendezvousConfig) -> Self {
        Self::new(config.timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of pending entries, waiting or delivered.
    pub fn pending(&self) -> usize {
        self.store.len()
    }

    /// Whether anything is held for `id`.
    pub fn is_pending(&self, id: &CorrelationId) -> bool {
        self.store.contains(id)
    }

    /// State of the slot for `id`.
    pub fn state(&self, id: &CorrelationId) -> Option<EntryState> {
        self.store.state(id)
    }

    /// Pending entries as `(waiting, delivered)`.
    pub fn summary(&self) -> (usize, usize) {
        self.store.summary()
    }

    /// Park until the result for `id` arrives, the timeout elapses or the
    /// client goes away.
    ///
    /// Returns immediately with a result delivered earlier, with
    /// [`Outcome::Accepted`] if another request already waits on `id`, and
    /// with [`Outcome::Aborted`] if the client is already gone or the
    /// response has already started. Dropping the returned future counts as
    /// a disconnect.
    pub async fn await_result(&self, id: CorrelationId, client: &ClientContext) -> Outcome<T> {
        if client.is_cancelled() {
            tracing::debug!(correlation_id = %id, "Client already gone, not parking");
            return Outcome::Aborted;
        }
        if client.response_started() {
            tracing::debug!(correlation_id = %id, "Response already started, not parking");
            return Outcome::Aborted;
        }

        let token = EntryToken::next();
        let (completion, settled) = oneshot::channel();
        let mut candidate = PendingEntry::Waiting(Waiter::new(token, completion, self.arm_timer(id, token)));

        loop {
            match self.store.insert_if_absent(id, candidate) {
                Ok(()) => break,
                Err(Occupied {
                    rejected,
                    existing: EntryState::Delivered,
                }) => {
                    match self
                        .store
                        .take(&id, EntryState::Delivered)
                        .and_then(PendingEntry::into_delivery)
                    {
                        Some(early) => {
                            drop(rejected);
                            tracing::debug!(correlation_id = %id, "Result was already delivered");
                            metrics::record_parked();
                            metrics::record_outcome("delivered", Duration::ZERO);
                            metrics::record_pending(self.store.len());
                            return Outcome::Delivered(early.into_payload());
                        }
                        // Evicted between the two steps; the slot may be free now.
                        None => candidate = rejected,
                    }
                }
                Err(Occupied {
                    existing: EntryState::Waiting,
                    ..
                }) => {
                    tracing::debug!(correlation_id = %id, "Another request already waits on this id");
                    metrics::record_outcome("duplicate", Duration::ZERO);
                    return Outcome::Accepted;
                }
            }
        }

        tracing::debug!(correlation_id = %id, timeout = ?self.timeout, "Request parked");
        metrics::record_parked();
        metrics::record_pending(self.store.len());

        let started = Instant::now();
        let outcome = self.wait(id, token, settled, client.cancellation()).await;
        metrics::record_outcome(outcome.as_str(), started.elapsed());
        metrics::record_pending(self.store.len());
        outcome
    }

    /// Hand `payload` to whichever request waits, or will wait, on `id`.
    ///
    /// Never blocks. Must be called from within a tokio runtime.
    pub fn deliver_result(&self, id: CorrelationId, payload: T) -> DeliveryOutcome {
        let mut payload = payload;
        let mut attempts = 0u32;

        let outcome = loop {
            attempts += 1;

            if let Some(waiter) = self
                .store
                .take(&id, EntryState::Waiting)
                .and_then(PendingEntry::into_waiter)
            {
                waiter.complete(Outcome::Delivered(payload));
                break DeliveryOutcome::Completed;
            }

            let token = EntryToken::next();
            let early = EarlyDelivery::new(token, payload, self.arm_timer(id, token));
            match self.store.insert_if_absent(id, PendingEntry::Delivered(early)) {
                Ok(()) => break DeliveryOutcome::Stored,
                Err(Occupied {
                    rejected: PendingEntry::Delivered(early),
                    existing: EntryState::Waiting,
                }) => {
                    // A request parked in between; take it on the next pass.
                    tracing::trace!(correlation_id = %id, attempts, "Delivery raced a registration, retrying");
                    payload = early.into_payload();
                }
                Err(_) => break DeliveryOutcome::Duplicate,
            }
        };

        match outcome {
            DeliveryOutcome::Completed => {
                tracing::debug!(correlation_id = %id, "Result handed to waiting request")
            }
            DeliveryOutcome::Stored => {
                tracing::debug!(correlation_id = %id, "Result stored until a request picks it up")
            }
            DeliveryOutcome::Duplicate => {
                tracing::debug!(correlation_id = %id, "Duplicate delivery dropped")
            }
        }
        metrics::record_delivery(outcome.as_str());
        metrics::record_pending(self.store.len());
        outcome
    }

    async fn wait(
        &self,
        id: CorrelationId,
        token: EntryToken,
        mut settled: oneshot::Receiver<Outcome<T>>,
        cancellation: &CancellationToken,
    ) -> Outcome<T> {
        let mut guard = WaitGuard {
            store: &self.store,
            id,
            token,
            armed: true,
        };

        let outcome = tokio::select! {
            biased;
            result = &mut settled => result,
            () = cancellation.cancelled() => {
                on_cancel(&self.store, id, token);
                // Either our cancellation or whoever beat it has settled by now.
                settled.await
            }
        };

        guard.armed = false;
        // A dropped sender means the entry vanished without an outcome.
        outcome.unwrap_or(Outcome::Accepted)
    }

    fn arm_timer(&self, id: CorrelationId, token: EntryToken) -> TimeoutTimer {
        let store = Arc::downgrade(&self.store);
        TimeoutTimer::spawn(self.timeout, move || on_timeout(&store, id, token))
    }
}

/// Releases the waiting slot if the parked future is dropped mid-wait.
struct WaitGuard<'a, T> {
    store: &'a Store<T>,
    id: CorrelationId,
    token: EntryToken,
    armed: bool,
}

impl<T> Drop for WaitGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            on_cancel(self.store, self.id, self.token);
        }
    }
}

fn on_timeout<T>(store: &Weak<Store<T>>, id: CorrelationId, token: EntryToken) {
    let Some(store) = store.upgrade() else {
        return;
    };

    match store.take_token(&id, token) {
        None => {
            tracing::trace!(correlation_id = %id, "Timer fired after entry was resolved");
        }
        Some(PendingEntry::Waiting(waiter)) => {
            tracing::debug!(correlation_id = %id, "Wait timed out, answering accepted");
            metrics::record_eviction("timeout");
            waiter.expire();
        }
        Some(PendingEntry::Delivered(early)) => {
            tracing::debug!(correlation_id = %id, "Discarding result nobody picked up");
            metrics::record_eviction("unclaimed");
            early.expire();
        }
    }
    metrics::record_pending(store.len());
}

fn on_cancel<T>(store: &Store<T>, id: CorrelationId, token: EntryToken) {
    let cancelled = store
        .remove_if(&id, |entry| entry.is_waiting() && entry.token() == token)
        .and_then(PendingEntry::into_waiter);

    if let Some(waiter) = cancelled {
        tracing::debug!(correlation_id = %id, "Client disconnected while parked");
        metrics::record_eviction("cancelled");
        waiter.complete(Outcome::Aborted);
    }
}
