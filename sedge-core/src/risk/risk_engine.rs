//! Pre-trade checks, signal-to-order conversion, and the kill switch
//!
//! Subscribes to `SignalEvent` and `RiskViolationEvent` on the risk bus,
//! in that order. A passing signal becomes an [`Order`] with a fresh id
//! and is published back on the same bus wrapped in an [`OrderEvent`].
//!
//! The kill switch latches: once set, by a risk violation or by an
//! operator HALT, every subsequent signal is dropped and nothing in the
//! running engine clears it. Resuming trading means restarting the
//! process after reviewing the condition.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

use crate::bus::{EventBus, SubscriptionId};
use crate::concurrent::OrderIdSource;
use crate::core::events::{OrderEvent, RiskViolationEvent, SignalEvent};
use crate::core::types::{Order, RiskLimits};
use crate::risk::position_engine::PositionEngine;
use parking_lot::Mutex;

/// Every admitted signal becomes an order of this size. A richer mapping
/// from signal strength to size is future work.
const ORDER_QUANTITY: f64 = 1.0;

pub struct RiskEngine {
    bus: Arc<EventBus>,
    order_ids: Arc<OrderIdSource>,
    positions: Arc<PositionEngine>,
    limits: RiskLimits,
    halted: AtomicBool,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl RiskEngine {
    pub fn new(
        bus: Arc<EventBus>,
        order_ids: Arc<OrderIdSource>,
        positions: Arc<PositionEngine>,
        limits: RiskLimits,
    ) -> Arc<Self> {
        let engine = Arc::new(Self {
            bus: Arc::clone(&bus),
            order_ids,
            positions,
            limits,
            halted: AtomicBool::new(false),
            subscriptions: Mutex::new(Vec::new()),
        });

        let weak: Weak<Self> = Arc::downgrade(&engine);
        let signal_sub = bus.subscribe_to::<SignalEvent, _>(move |event| {
            if let Some(engine) = weak.upgrade() {
                engine.on_signal(event);
            }
        });

        let weak: Weak<Self> = Arc::downgrade(&engine);
        let violation_sub = bus.subscribe_to::<RiskViolationEvent, _>(move |event| {
            if let Some(engine) = weak.upgrade() {
                engine.on_violation(event);
            }
        });

        engine
            .subscriptions
            .lock()
            .extend([signal_sub, violation_sub]);
        engine
    }

    /// Latch the kill switch from outside the risk thread (the IPC
    /// command handler uses this for HALT).
    pub fn halt_trading(&self) {
        self.halted.store(true, Ordering::Release);
        info!("kill switch engaged by operator");
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    fn on_signal(&self, event: &SignalEvent) {
        if self.is_halted() {
            debug!(symbol = %event.symbol, "kill switch engaged, dropping signal");
            return;
        }

        // Pre-trade cap: reject anything that would push the absolute net
        // past the per-symbol limit. Landing exactly on the limit is fine.
        let current_net = self
            .positions
            .position(&event.symbol)
            .map(|p| p.net_quantity)
            .unwrap_or(0.0);
        if current_net.abs() + ORDER_QUANTITY > self.limits.max_position_per_symbol {
            info!(
                symbol = %event.symbol,
                current_net,
                limit = self.limits.max_position_per_symbol,
                "position limit would be breached, dropping signal"
            );
            return;
        }

        let order = Order::new(
            self.order_ids.next_id(),
            event.strategy_id.clone(),
            event.symbol.clone(),
            event.side,
            ORDER_QUANTITY,
            event.price,
        );

        self.bus.publish(
            &OrderEvent {
                order,
                timestamp: event.timestamp,
                sequence_id: event.sequence_id,
            }
            .into(),
        );
    }

    fn on_violation(&self, event: &RiskViolationEvent) {
        error!(
            symbol = %event.symbol,
            reason = %event.reason,
            current = event.current_value,
            limit = event.limit_value,
            "risk violation received, latching kill switch"
        );
        self.halted.store(true, Ordering::Release);
    }
}

impl Drop for RiskEngine {
    fn drop(&mut self) {
        for id in self.subscriptions.lock().drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}
