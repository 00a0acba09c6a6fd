//! Shared soft-event queue between the listener and the dispatcher.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::SoftEvent;

/// FIFO of decoded soft events in arrival order
///
/// Cloning shares the same queue. The lock is only held for a push or a
/// drain and never across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    inner: Arc<Mutex<VecDeque<SoftEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event at the tail
    pub fn push(&self, event: SoftEvent) {
        let depth = {
            let mut queue = self.lock();
            queue.push_back(event);
            queue.len()
        };
        metrics::gauge!("soft_event_queue_depth").set(depth as f64);
    }

    /// Take every queued event, leaving the queue empty
    pub fn drain(&self) -> VecDeque<SoftEvent> {
        let drained = std::mem::take(&mut *self.lock());
        metrics::gauge!("soft_event_queue_depth").set(0.0);
        drained
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated
    fn lock(&self) -> MutexGuard<'_, VecDeque<SoftEvent>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
