//! Per-entry timeout timers.
//!
//! A timer is a spawned task that sleeps and then runs its callback once.
//! Dropping the timer aborts the task, so whoever removes an entry from the
//! store releases its timer just by letting the entry go.

use std::time::Duration;
use tokio::task::AbortHandle;

/// Owned handle to a pending timeout.
#[derive(Debug)]
pub struct TimeoutTimer {
    handle: Option<AbortHandle>,
}

impl TimeoutTimer {
    /// Run `on_fire` after `after` unless the timer is dropped first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(after: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            on_fire();
        });
        Self {
            handle: Some(task.abort_handle()),
        }
    }

    /// Release the handle without aborting the task.
    ///
    /// Used by the firing task itself when it removes its own entry.
    pub fn disarm(mut self) {
        self.handle.take();
    }

    /// Whether the task is still scheduled.
    pub fn is_pending(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimeoutTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
