//! Strategy seam
//!
//! Strategies never talk to execution. They observe ticks and express
//! intent as [`SignalEvent`]s; the risk engine decides what becomes an
//! order. [`StrategyHost`] is the bus adapter: it subscribes to
//! `MarketDataEvent` on the strategy bus and publishes whatever signal the
//! wrapped [`Strategy`] returns, keeping the strategy itself free of bus
//! plumbing.

pub mod threshold;

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::bus::{EventBus, SubscriptionId};
use crate::core::events::{MarketDataEvent, SignalEvent};

pub use threshold::ThresholdStrategy;

pub trait Strategy: Send + Sync {
    /// Stable identifier stamped into every signal this strategy emits.
    fn id(&self) -> &str;

    /// Observe one tick; return a signal to publish, or `None`.
    fn on_market_data(&self, tick: &MarketDataEvent) -> Option<SignalEvent>;
}

pub struct StrategyHost {
    bus: Arc<EventBus>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl StrategyHost {
    pub fn new(bus: Arc<EventBus>, strategy: Arc<dyn Strategy>) -> Arc<Self> {
        let host = Arc::new(Self {
            bus: Arc::clone(&bus),
            subscriptions: Mutex::new(Vec::new()),
        });

        let weak: Weak<Self> = Arc::downgrade(&host);
        let sub = bus.subscribe_to::<MarketDataEvent, _>(move |tick| {
            let Some(host) = weak.upgrade() else {
                return;
            };
            if let Some(signal) = strategy.on_market_data(tick) {
                host.bus.publish(&signal.into());
            }
        });

        host.subscriptions.lock().push(sub);
        host
    }
}

impl Drop for StrategyHost {
    fn drop(&mut self) {
        for id in self.subscriptions.lock().drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ms_to_timestamp;
    use parking_lot::Mutex as PlMutex;

    fn tick(price: f64) -> MarketDataEvent {
        MarketDataEvent {
            symbol: "AAPL".to_string(),
            price,
            quantity: 100.0,
            timestamp: ms_to_timestamp(1_000),
            sequence_id: 3,
        }
    }

    #[test]
    fn test_host_publishes_strategy_signals() {
        let bus = Arc::new(EventBus::new());
        let strategy: Arc<dyn Strategy> = Arc::new(ThresholdStrategy::default());
        let _host = StrategyHost::new(Arc::clone(&bus), strategy);

        let signals = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&signals);
        bus.subscribe_to::<SignalEvent, _>(move |s| sink.lock().push(s.clone()));

        bus.publish(&tick(150.0).into());

        let seen = signals.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].symbol, "AAPL");
        assert_eq!(seen[0].sequence_id, 3);
    }

    #[test]
    fn test_host_drop_unsubscribes() {
        let bus = Arc::new(EventBus::new());
        let strategy: Arc<dyn Strategy> = Arc::new(ThresholdStrategy::default());
        let host = StrategyHost::new(Arc::clone(&bus), strategy);

        assert_eq!(bus.subscriber_count(), 1);
        drop(host);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
