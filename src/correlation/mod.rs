//! Correlation subsystem.
//!
//! # Data Flow
//! ```text
//! upstream 202 + CorrelationId header ─┐
//!                                      ├─→ id.rs (parse into CorrelationId)
//! inbound message (correlationId) ─────┘
//!                                      → store.rs (one slot per id)
//!                                      → rendezvous engine merges the two sides
//! ```
//!
//! # Design Decisions
//! - The store is a leaf: it knows slots, states and tokens, nothing about
//!   HTTP, timers or payloads
//! - Every mutation is a single-key atomic step on a sharded map
//! - Tokens make removals precise, so a stale timer never evicts a newer entry

pub mod id;
pub mod store;

pub use id::{CorrelationId, CorrelationIdError};
pub use store::{CorrelationStore, EntryState, EntryToken, Occupied, Slot};
