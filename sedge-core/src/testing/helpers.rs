//! Builders and observers shared by unit and integration tests.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crate::bus::{EventBus, SubscriptionId};
use crate::core::clock::ms_to_timestamp;
use crate::core::events::{Event, EventPayload, MarketDataEvent, SignalEvent};
use crate::core::types::{Order, OrderId, Position, Side};

pub fn make_tick(symbol: &str, price: f64, sequence_id: u64) -> MarketDataEvent {
    MarketDataEvent {
        symbol: symbol.to_string(),
        price,
        quantity: 100.0,
        timestamp: ms_to_timestamp(1_700_000_000_000 + sequence_id as i64),
        sequence_id,
    }
}

pub fn make_signal(symbol: &str, side: Side, price: f64, sequence_id: u64) -> SignalEvent {
    SignalEvent {
        strategy_id: "test".to_string(),
        symbol: symbol.to_string(),
        side,
        strength: 1.0,
        price,
        timestamp: ms_to_timestamp(1_700_000_000_000 + sequence_id as i64),
        sequence_id,
    }
}

pub fn make_order(id: OrderId, symbol: &str, side: Side, quantity: f64, price: f64) -> Order {
    Order::new(id, "test", symbol, side, quantity, price)
}

pub fn make_position(symbol: &str, net: f64, avg: f64, pnl: f64) -> Position {
    Position {
        symbol: symbol.to_string(),
        net_quantity: net,
        average_price: avg,
        realized_pnl: pnl,
    }
}

/// Bus observer that records every event it sees, in arrival order.
/// Unsubscribes itself when dropped.
pub struct Recorder {
    bus: Arc<EventBus>,
    events: Mutex<Vec<Event>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Recorder {
    pub fn attach(bus: &Arc<EventBus>) -> Arc<Self> {
        let recorder = Arc::new(Self {
            bus: Arc::clone(bus),
            events: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        });

        let weak: Weak<Self> = Arc::downgrade(&recorder);
        let id = bus.subscribe(move |event| {
            if let Some(recorder) = weak.upgrade() {
                recorder.events.lock().push(event.clone());
            }
        });

        *recorder.subscription.lock() = Some(id);
        recorder
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// All recorded payloads of one type, in arrival order.
    pub fn payloads<P: EventPayload + Clone>(&self) -> Vec<P> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| P::from_event(e).cloned())
            .collect()
    }

    pub fn count_of<P: EventPayload>(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| P::from_event(e).is_some())
            .count()
    }

    /// Poll until `predicate(self)` holds or the timeout expires. Returns
    /// whether the predicate held.
    pub fn wait_until(&self, timeout: Duration, predicate: impl Fn(&Self) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if predicate(self) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        predicate(self)
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.lock().take() {
            self.bus.unsubscribe(id);
        }
    }
}
