//! Caller-visible results of the rendezvous.

use serde::Serialize;

/// What a parked request ends up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The asynchronous result arrived.
    Delivered(T),
    /// No result yet: the wait expired or another request owns the id.
    Accepted,
    /// The client went away; nothing should be written.
    Aborted,
}

impl<T> Outcome<T> {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Outcome::Delivered(_))
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Outcome::Aborted)
    }

    /// Take the payload, if one was delivered.
    pub fn into_payload(self) -> Option<T> {
        match self {
            Outcome::Delivered(payload) => Some(payload),
            _ => None,
        }
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Delivered(_) => "delivered",
            Outcome::Accepted => "accepted",
            Outcome::Aborted => "aborted",
        }
    }
}

/// What happened to a delivered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// A parked request was waiting and received the payload.
    Completed,
    /// Nobody was waiting; the payload is held until a request picks it up
    /// or the timeout evicts it.
    Stored,
    /// A result for this id is already held; this one was dropped.
    Duplicate,
}

impl DeliveryOutcome {
    /// Whether the payload was accepted by the engine.
    pub fn is_success(&self) -> bool {
        !matches!(self, DeliveryOutcome::Duplicate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Completed => "completed",
            DeliveryOutcome::Stored => "stored",
            DeliveryOutcome::Duplicate => "duplicate",
        }
    }
}
