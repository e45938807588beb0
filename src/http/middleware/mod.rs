//! HTTP middleware.

pub mod park;

pub use park::{park_accepted, ParkState};
