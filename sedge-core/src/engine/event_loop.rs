//! Per-thread event loop
//!
//! Owns one [`EventQueue`] and one [`EventBus`]. A single worker thread
//! drains the queue and publishes each item on the bus, so every
//! subscriber callback on that bus runs serialized on the loop thread.
//! Other threads hand work over with [`EventLoop::push`].
//!
//! When the queue is empty the worker parks on a condition variable with a
//! short timeout rather than blocking indefinitely, so a stop request is
//! observed promptly even under zero load. After `stop`, items still in
//! the queue are not guaranteed to have been drained.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

use crate::bus::EventBus;
use crate::concurrent::EventQueue;
use crate::core::events::Event;

/// How long the worker parks when idle before re-checking the running
/// flag. Short enough that `stop` is responsive, long enough to avoid a
/// busy wait.
const IDLE_WAIT: Duration = Duration::from_millis(10);

pub struct EventLoop {
    name: &'static str,
    queue: Arc<EventQueue<Event>>,
    bus: Arc<EventBus>,
    running: Arc<AtomicBool>,
    idle: Arc<(Mutex<()>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

impl EventLoop {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            queue: Arc::new(EventQueue::new()),
            bus: Arc::new(EventBus::new()),
            running: Arc::new(AtomicBool::new(false)),
            idle: Arc::new((Mutex::new(()), Condvar::new())),
            worker: None,
        }
    }

    /// Spawn the worker thread. Idempotent: a second call while running is
    /// a no-op.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }

        self.running.store(true, Ordering::Release);

        let name = self.name;
        let queue = Arc::clone(&self.queue);
        let bus = Arc::clone(&self.bus);
        let running = Arc::clone(&self.running);
        let idle = Arc::clone(&self.idle);

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(loop_name = name, "event loop worker started");
                while running.load(Ordering::Acquire) {
                    match queue.try_pop() {
                        Some(event) => bus.publish(&event),
                        None => {
                            let (lock, cv) = &*idle;
                            let mut guard = lock.lock();
                            cv.wait_for(&mut guard, IDLE_WAIT);
                        }
                    }
                }
                debug!(loop_name = name, "event loop worker exited");
            })
            .expect("failed to spawn event loop thread");

        self.worker = Some(handle);
    }

    /// Signal the worker to exit, wake it, and join it. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.idle.1.notify_all();

        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }

    /// Enqueue an event for this loop. Safe from any thread.
    pub fn push(&self, event: Event) {
        self.queue.push(event);
    }

    /// The bus this loop publishes on. Subscribe here to run callbacks on
    /// the loop thread.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Handle to the loop's queue, for cross-thread bridges that forward
    /// events from another bus.
    pub fn queue(&self) -> Arc<EventQueue<Event>> {
        Arc::clone(&self.queue)
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ms_to_timestamp;
    use crate::core::events::MarketDataEvent;
    use std::sync::mpsc;
    use std::time::Duration;

    fn tick(seq: u64) -> Event {
        MarketDataEvent {
            symbol: "AAPL".to_string(),
            price: 150.0,
            quantity: 100.0,
            timestamp: ms_to_timestamp(1_000),
            sequence_id: seq,
        }
        .into()
    }

    #[test]
    fn test_pushed_events_are_published_on_worker() {
        let mut el = EventLoop::new("test-loop");
        let (tx, rx) = mpsc::channel();

        el.bus().subscribe(move |event| {
            tx.send(event.sequence_id()).unwrap();
        });

        el.start();
        el.push(tick(1));
        el.push(tick(2));

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 1);
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 2);

        el.stop();
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut el = EventLoop::new("test-loop");
        el.start();
        el.start();
        el.stop();
    }

    #[test]
    fn test_stop_is_idempotent_and_restartable() {
        let mut el = EventLoop::new("test-loop");
        el.stop();

        el.start();
        el.stop();
        el.stop();

        let (tx, rx) = mpsc::channel();
        el.bus().subscribe(move |event| {
            tx.send(event.sequence_id()).unwrap();
        });

        el.start();
        el.push(tick(9));
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 9);
        el.stop();
    }

    #[test]
    fn test_stop_returns_promptly_with_empty_queue() {
        let mut el = EventLoop::new("test-loop");
        el.start();

        let started = std::time::Instant::now();
        el.stop();
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
