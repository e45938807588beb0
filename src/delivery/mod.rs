//! Delivery adapters.
//!
//! # Data Flow
//! ```text
//! message bus client ─→ mpsc channel ─→ consumer.rs ─┐
//!                                                    ├─→ engine.deliver_result
//! webhook push ───────→ POST /messages (http::ingest)┘
//! ```
//!
//! Both paths extract the correlation id from the message and hand the
//! payload over; neither interprets message content.

pub mod consumer;
pub mod message;

pub use consumer::{dispatch, DeliveryConsumer};
pub use message::{IncomingMessage, Message};
