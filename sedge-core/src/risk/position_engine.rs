//! Per-symbol position and PnL accounting
//!
//! Subscribes to `OrderEvent` first and `ExecutionReportEvent` second on
//! the risk bus. The order callback caches `{order id -> symbol, side}` so
//! the later fill callback can attribute the fill; that relies on the
//! pipeline guarantee that the OrderEvent for an id is fully processed on
//! the risk thread before any report for the same id can arrive (the
//! execution engine publishes its reports from inside its own OrderEvent
//! handler on the order-routing bus, and those reports re-enter the risk
//! queue as separate items).
//!
//! The position map uses a reader-writer lock because its snapshot reader
//! is called from the IPC thread; writes happen only on the risk thread.
//!
//! After applying a fill, if realized PnL has dropped below the configured
//! drawdown floor, a [`RiskViolationEvent`] is published right after the
//! position update. The risk engine consumes it and latches the kill
//! switch; this engine does not know the risk engine exists.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{error, warn};

use crate::bus::{EventBus, SubscriptionId};
use crate::core::events::{
    ExecutionReportEvent, OrderEvent, PositionUpdateEvent, RiskViolationEvent,
};
use crate::core::types::{ExecutionStatus, OrderId, Position, RiskLimits, Side};

/// Reason attached to drawdown violations.
const DRAWDOWN_REASON: &str = "Max Drawdown Exceeded";

#[derive(Debug, Clone)]
struct OrderInfo {
    symbol: String,
    side: Side,
}

pub struct PositionEngine {
    bus: Arc<EventBus>,
    limits: RiskLimits,
    positions: RwLock<HashMap<String, Position>>,
    order_cache: Mutex<HashMap<OrderId, OrderInfo>>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl PositionEngine {
    pub fn new(bus: Arc<EventBus>, limits: RiskLimits) -> Arc<Self> {
        let engine = Arc::new(Self {
            bus: Arc::clone(&bus),
            limits,
            positions: RwLock::new(HashMap::new()),
            order_cache: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(Vec::new()),
        });

        // OrderEvent first, ExecutionReportEvent second: the cache entry
        // must exist before a fill for the same order can be processed.
        let weak: Weak<Self> = Arc::downgrade(&engine);
        let order_sub = bus.subscribe_to::<OrderEvent, _>(move |event| {
            if let Some(engine) = weak.upgrade() {
                engine.on_order(event);
            }
        });

        let weak: Weak<Self> = Arc::downgrade(&engine);
        let fill_sub = bus.subscribe_to::<ExecutionReportEvent, _>(move |event| {
            if let Some(engine) = weak.upgrade() {
                engine.on_fill(event);
            }
        });

        engine.subscriptions.lock().extend([order_sub, fill_sub]);
        engine
    }

    /// Warm-up only: insert or overwrite a position recovered from the
    /// exchange. Publishes nothing. Must not be called once the engine is
    /// running.
    pub fn hydrate(&self, position: Position) {
        self.positions
            .write()
            .insert(position.symbol.clone(), position);
    }

    /// Snapshot of one symbol's position, if any.
    pub fn position(&self, symbol: &str) -> Option<Position> {
        self.positions.read().get(symbol).cloned()
    }

    /// Snapshot of every position. Called from the IPC thread for STATUS.
    pub fn snapshots(&self) -> Vec<Position> {
        self.positions.read().values().cloned().collect()
    }

    fn on_order(&self, event: &OrderEvent) {
        self.order_cache.lock().insert(
            event.order.id,
            OrderInfo {
                symbol: event.order.symbol.clone(),
                side: event.order.side,
            },
        );
    }

    fn on_fill(&self, event: &ExecutionReportEvent) {
        // Only fills move positions; Accepted and Rejected reports are
        // ignored here.
        if event.status != ExecutionStatus::Filled {
            return;
        }

        let Some(info) = self.order_cache.lock().remove(&event.order_id) else {
            warn!(
                order_id = event.order_id,
                "fill for unknown order, dropping"
            );
            return;
        };

        let signed_qty = info.side.sign() * event.filled_quantity;

        // Mutate and snapshot under the write lock; publish outside it so
        // subscriber callbacks never run while the map is locked.
        let (update, violation) = {
            let mut positions = self.positions.write();
            let position = positions
                .entry(info.symbol.clone())
                .or_insert_with(|| Position::flat(info.symbol.clone()));

            apply_fill(position, signed_qty, event.fill_price);

            let update = PositionUpdateEvent {
                position: position.clone(),
                timestamp: event.timestamp,
                sequence_id: event.sequence_id,
            };

            let violation = (position.realized_pnl < self.limits.max_drawdown).then(|| {
                RiskViolationEvent {
                    symbol: info.symbol.clone(),
                    reason: DRAWDOWN_REASON.to_string(),
                    current_value: position.realized_pnl,
                    limit_value: self.limits.max_drawdown,
                    timestamp: event.timestamp,
                    sequence_id: event.sequence_id,
                }
            });

            (update, violation)
        };

        self.bus.publish(&update.into());

        if let Some(violation) = violation {
            error!(
                symbol = %violation.symbol,
                realized_pnl = violation.current_value,
                floor = violation.limit_value,
                "drawdown floor breached, publishing risk violation"
            );
            self.bus.publish(&violation.into());
        }
    }
}

impl Drop for PositionEngine {
    fn drop(&mut self) {
        for id in self.subscriptions.lock().drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}

/// The three-case fill arithmetic.
///
/// * Flat or same-direction: the position grows and the average price is
///   the quantity-weighted blend of the old average and the fill price.
/// * Opposite direction within the position: the closed portion realizes
///   `closed * (price - avg) * sign(net)`; the average is untouched.
/// * Opposite direction past zero: the whole position is closed at the
///   fill price, then the remainder opens a new position at that price.
pub fn apply_fill(position: &mut Position, signed_qty: f64, price: f64) {
    let current = position.net_quantity;

    if current == 0.0 {
        position.net_quantity = signed_qty;
        position.average_price = price;
        return;
    }

    let same_direction = (current > 0.0) == (signed_qty > 0.0);
    if same_direction {
        let new_total = current + signed_qty;
        position.average_price =
            (current * position.average_price + signed_qty * price) / new_total;
        position.net_quantity = new_total;
        return;
    }

    let direction = if current > 0.0 { 1.0 } else { -1.0 };
    let abs_current = current.abs();
    let abs_fill = signed_qty.abs();

    if abs_fill <= abs_current {
        // Partial or exact close; no reversal.
        position.realized_pnl += abs_fill * (price - position.average_price) * direction;
        position.net_quantity = current + signed_qty;
        return;
    }

    // Reversal: close everything, then open the remainder the other way.
    position.realized_pnl += abs_current * (price - position.average_price) * direction;
    let opened = abs_fill - abs_current;
    position.net_quantity = signed_qty.signum() * opened;
    position.average_price = price;
}
