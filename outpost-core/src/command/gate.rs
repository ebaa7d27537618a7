use crate::command::CommandError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many external processes may run at once, system-wide.
#[derive(Debug, Clone)]
pub struct CommandGate {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
}

/// RAII slot in the [`CommandGate`].
///
/// Invariants:
/// - A permit exists only after a successful acquire
/// - The slot is returned exactly once, when the permit is dropped
#[derive(Debug)]
pub struct CommandPermit {
    _permit: OwnedSemaphorePermit,
}

impl CommandGate {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Wait up to `timeout` for a free slot.
    ///
    /// Only the calling task is suspended. A timeout yields
    /// [`CommandError::AcquireTimeout`] so callers can report backpressure.
    pub async fn acquire(&self, timeout: Duration) -> Result<CommandPermit, CommandError> {
        match tokio::time::timeout(timeout, self.semaphore.clone().acquire_owned()).await {
            Ok(Ok(permit)) => Ok(CommandPermit { _permit: permit }),
            Ok(Err(_closed)) => Err(CommandError::GateClosed),
            Err(_elapsed) => Err(CommandError::AcquireTimeout { waited: timeout }),
        }
    }

    /// Reject all current and future waiters. Used on shutdown.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}
