//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Client request
//!     → server.rs (Axum setup, forward to upstream)
//!     → middleware/park.rs (202 + correlation header? park it)
//!     → response.rs (200 with the result, or 202 with the id)
//!     → Send to client
//!
//! Result message
//!     → ingest.rs (POST, parse, hand to the rendezvous engine)
//! ```

pub mod ingest;
pub mod middleware;
pub mod response;
pub mod server;

pub use server::{AppState, HttpServer};
