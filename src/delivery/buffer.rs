//! Byte accounting for the outbound queue.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed byte budget shared by many producers and one consumer.
///
/// Producers reserve a frame's size before queueing it; the worker releases
/// it once the frame has been written or discarded. A reservation that would
/// exceed capacity fails, so the incoming frame is the one dropped.
#[derive(Debug)]
pub struct ByteBudget {
    capacity: usize,
    used: AtomicUsize,
}

impl ByteBudget {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: AtomicUsize::new(0),
        }
    }

    /// Reserve `bytes`, returning `false` if the budget would overflow.
    pub fn try_reserve(&self, bytes: usize) -> bool {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(bytes).filter(|total| *total <= self.capacity)
            })
            .is_ok()
    }

    pub fn release(&self, bytes: usize) {
        let _ = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(bytes))
            });
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.used() == 0
    }
}
