//! Synchronous front for asynchronous backends.
//!
//! The gateway forwards requests to an upstream that answers `202 Accepted`
//! with a correlation id, holds the client connection open, and answers it
//! with the result once that result is delivered back under the same id.

pub mod admin;
pub mod config;
pub mod correlation;
pub mod delivery;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rendezvous;

pub use config::GatewayConfig;
pub use correlation::CorrelationId;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rendezvous::{ClientContext, DeliveryOutcome, Outcome, RendezvousEngine};
