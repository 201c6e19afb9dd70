//! Price-threshold strategy
//!
//! Emits a Buy signal with strength 1.0 whenever the tick price is above
//! the configured threshold. With the default threshold of 0.0 every tick
//! with a positive price produces a signal, which keeps the pipeline easy
//! to exercise end to end; a production strategy would replace this while
//! keeping the same [`Strategy`](super::Strategy) seam.

use crate::core::events::{MarketDataEvent, SignalEvent};
use crate::core::types::Side;
use crate::strategy::Strategy;

pub struct ThresholdStrategy {
    strategy_id: String,
    price_threshold: f64,
}

impl ThresholdStrategy {
    pub fn new(strategy_id: impl Into<String>, price_threshold: f64) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            price_threshold,
        }
    }
}

impl Default for ThresholdStrategy {
    fn default() -> Self {
        Self::new("threshold", 0.0)
    }
}

impl Strategy for ThresholdStrategy {
    fn id(&self) -> &str {
        &self.strategy_id
    }

    fn on_market_data(&self, tick: &MarketDataEvent) -> Option<SignalEvent> {
        if tick.price <= self.price_threshold {
            return None;
        }

        Some(SignalEvent {
            strategy_id: self.strategy_id.clone(),
            symbol: tick.symbol.clone(),
            side: Side::Buy,
            strength: 1.0,
            price: tick.price,
            timestamp: tick.timestamp,
            sequence_id: tick.sequence_id,
        })
    }
}
