//! Cooperative cancellation flag shared between a job's caller and its pipeline.
//!
//! Cancelling never interrupts running work. The pipeline polls
//! [`CancellationToken::is_cancelled`] at its checkpoints and, once the flag
//! is set, discards whatever it produced since the previous checkpoint. A
//! backend call already on the wire runs to completion; only its result is
//! thrown away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clonable handle to one job's cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns `true` if this call was the one that set it.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
