use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::domain::types::QueueSnapshot;

/// Bounded FIFO shared between the update handler and the processor.
///
/// When full, the oldest item is dropped so the newest posts always get evaluated.
#[derive(Debug)]
pub struct MessageQueue<T> {
    inner: Mutex<Inner<T>>,
    capacity: usize,
}

#[derive(Debug)]
struct Inner<T> {
    items: VecDeque<T>,
    dropped: u64,
}

impl<T> MessageQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(1_024)),
                dropped: 0,
            }),
            capacity,
        }
    }

    /// Enqueues `value`, returning the evicted item when the queue was full.
    pub fn push(&self, value: T) -> Option<T> {
        let mut inner = self.inner.lock();
        let evicted = if inner.items.len() >= self.capacity {
            inner.dropped = inner.dropped.saturating_add(1);
            inner.items.pop_front()
        } else {
            None
        };
        inner.items.push_back(value);
        if evicted.is_some() {
            tracing::warn!(
                target: "processor",
                capacity = self.capacity,
                dropped_total = inner.dropped,
                "queue full; dropped oldest message"
            );
        }
        evicted
    }

    /// Takes up to `max` items in arrival order.
    pub fn drain_batch(&self, max: usize) -> Vec<T> {
        let mut inner = self.inner.lock();
        let take = max.min(inner.items.len());
        inner.items.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let inner = self.inner.lock();
        QueueSnapshot {
            pending: inner.items.len(),
            dropped: inner.dropped,
        }
    }
}
