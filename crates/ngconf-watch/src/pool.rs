//! Counting semaphore bounding how many watchers may be active
//! concurrently, built from `std::sync::{Mutex, Condvar}` per the design
//! note for `WatcherPool`.

use std::sync::Arc;
use std::sync::{Condvar, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("watcher pool is at capacity ({0} watchers)")]
    Full(usize),
}

struct Slots {
    available: Mutex<usize>,
    cond: Condvar,
}

/// Bounds the number of concurrently active watchers. Registration never
/// blocks: a full pool fails immediately rather than queuing, since a
/// blocked registration would itself be an unbounded resource.
pub struct WatcherPool {
    slots: Arc<Slots>,
    max: usize,
}

impl WatcherPool {
    pub fn new(max_watchers: usize) -> Self {
        Self {
            slots: Arc::new(Slots {
                available: Mutex::new(max_watchers),
                cond: Condvar::new(),
            }),
            max: max_watchers,
        }
    }

    /// Reserves one watcher slot, or fails with [`PoolError::Full`] if
    /// `max_watchers` are already active (scenario 7).
    pub fn try_acquire(&self) -> Result<WatcherSlot, PoolError> {
        let mut available = self.slots.available.lock().unwrap();
        if *available == 0 {
            return Err(PoolError::Full(self.max));
        }
        *available -= 1;
        Ok(WatcherSlot {
            slots: Arc::clone(&self.slots),
        })
    }

    /// Number of watchers currently active.
    pub fn active_count(&self) -> usize {
        self.max - *self.slots.available.lock().unwrap()
    }
}

/// An acquired slot in a [`WatcherPool`]; releases itself back to the pool
/// on drop, notifying anyone blocked on [`WatcherPool::wait_for_slot`].
pub struct WatcherSlot {
    slots: Arc<Slots>,
}

impl Drop for WatcherSlot {
    fn drop(&mut self) {
        let mut available = self.slots.available.lock().unwrap();
        *available += 1;
        self.slots.cond.notify_one();
    }
}

impl WatcherPool {
    /// Blocks until a slot becomes available, for callers willing to wait
    /// rather than fail fast.
    pub fn wait_for_slot(&self) -> WatcherSlot {
        let mut available = self.slots.available.lock().unwrap();
        while *available == 0 {
            available = self.slots.cond.wait(available).unwrap();
        }
        *available -= 1;
        WatcherSlot {
            slots: Arc::clone(&self.slots),
        }
    }
}
