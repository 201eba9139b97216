//! Fetch gate: global limit on concurrent page fetches
//!
//! Every fetch holds one slot for its whole duration, retries included.
//! Acquisition waits without a timeout; holders are themselves bounded by
//! the fetch timeout, so a slot always comes back. Closing the gate wakes
//! every waiter with `None`, which is how a cancelled crawl drains.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Fixed-capacity limiter over fetch operations
#[derive(Debug, Clone)]
pub struct FetchGate {
    slots: Arc<Semaphore>,
    capacity: usize,
}

/// A held fetch slot, released on drop
pub struct FetchSlot {
    _permit: OwnedSemaphorePermit,
}

impl FetchGate {
    /// Creates a gate with `capacity` slots (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a free slot
    ///
    /// Returns `None` once the gate has been closed.
    pub async fn acquire(&self) -> Option<FetchSlot> {
        let permit = Arc::clone(&self.slots).acquire_owned().await.ok()?;
        Some(FetchSlot { _permit: permit })
    }

    /// Refuses all current and future waiters
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}
