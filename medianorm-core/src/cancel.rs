//! Cooperative cancellation shared between the dispatcher, its workers and
//! the process invoker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A clonable stop flag. All clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Setting the flag more than once has no further effect.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
