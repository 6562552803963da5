//! Bounded-concurrency admission gate.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{Result, SearchError};

/// Default number of operations allowed in flight.
pub const DEFAULT_CAPACITY: usize = 10;

/// Limits how many operations run at once.
///
/// Callers beyond the capacity wait in `acquire` until a permit is
/// released. Clones share the same slots.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held slot. The slot frees when the permit is released or dropped.
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// Creates a gate; a capacity of zero means [`DEFAULT_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot.
    pub async fn acquire(&self) -> Result<GatePermit> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| SearchError::Other("admission gate closed".to_string()))?;
        Ok(GatePermit { _permit: permit })
    }

    /// Returns a slot to the gate.
    pub fn release(&self, permit: GatePermit) {
        drop(permit);
    }

    /// Runs `operation` while holding a slot. The slot is released whether
    /// the operation succeeds or fails.
    pub async fn run<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let permit = self.acquire().await?;
        let result = operation.await;
        self.release(permit);
        result
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of free slots right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
