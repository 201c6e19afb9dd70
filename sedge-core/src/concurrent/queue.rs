//! Unbounded thread-safe FIFO queue
//!
//! The hand-off point between threads: producers push from anywhere, one
//! consumer (an event loop) drains. The total order of `push` calls is the
//! order any consumer observes.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::Duration;

pub struct EventQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Condvar,
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
        }
    }

    /// Enqueue one item. Never fails, never blocks beyond the internal
    /// lock; wakes at most one blocked taker.
    pub fn push(&self, value: T) {
        self.items.lock().push_back(value);
        self.available.notify_one();
    }

    /// Dequeue one item, blocking until one is available. Survives
    /// spurious wakeups by re-checking.
    pub fn pop(&self) -> T {
        let mut items = self.items.lock();
        loop {
            if let Some(value) = items.pop_front() {
                return value;
            }
            self.available.wait(&mut items);
        }
    }

    /// Dequeue one item if available, without blocking.
    pub fn try_pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Like [`Self::pop`] but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut items = self.items.lock();
        if items.is_empty() {
            self.available.wait_for(&mut items, timeout);
        }
        items.pop_front()
    }

    /// Advisory emptiness snapshot; may be stale by the time it returns.
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
