//! Per-request signals the engine needs from the protocol adapter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// The client side of a parked request.
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    cancellation: CancellationToken,
    response_started: Arc<AtomicBool>,
}

impl ClientContext {
    /// Create a context driven by the given disconnect signal.
    pub fn new(cancellation: CancellationToken) -> Self {
        Self {
            cancellation,
            response_started: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal fired when the client goes away.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Record that some other path began writing the response.
    pub fn mark_response_started(&self) {
        self.response_started.store(true, Ordering::Release);
    }

    pub fn response_started(&self) -> bool {
        self.response_started.load(Ordering::Acquire)
    }
}
