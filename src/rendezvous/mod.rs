//! Rendezvous subsystem.
//!
//! # Data Flow
//! ```text
//! parked request ──→ engine.rs::await_result ──┐
//!                                              ├─→ correlation store (one slot per id)
//! inbound message ─→ engine.rs::deliver_result ┘
//!                                              ← timer.rs (per-entry timeout task)
//!                                              ← context.rs (client disconnect signal)
//! ```
//!
//! # Design Decisions
//! - Exactly one of delivery, timeout or cancellation settles a waiter
//! - Completion is a oneshot sender moved out of the store, so it settles once
//! - Timers and cancellation subscriptions are released by ownership on
//!   every exit path
//! - A delivery that arrives after its waiter was cancelled is held like any
//!   early delivery and evicted by its own timeout

pub mod context;
pub mod engine;
pub mod entry;
pub mod outcome;
pub mod timer;

pub use context::ClientContext;
pub use engine::RendezvousEngine;
pub use entry::PendingEntry;
pub use outcome::{DeliveryOutcome, Outcome};
pub use timer::TimeoutTimer;
