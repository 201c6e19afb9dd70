//! Simulated execution engine
//!
//! Stands in for a broker connection on the order-routing bus. Every
//! incoming order is acknowledged and then filled completely at its limit
//! price, both reports published synchronously from the OrderEvent
//! handler. The two-step Accepted-then-Filled sequence is kept because the
//! order tracker's state machine requires it; real broker integrations
//! will interleave the two, and downstream components must not assume they
//! arrive back to back.
//!
//! Report timestamps come from the injected [`Clock`]: the simulation
//! clock during backtests, the wall clock live. That is what keeps
//! backtest fill timestamps aligned with historical tick time instead of
//! the machine's clock.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use crate::bus::{EventBus, SubscriptionId};
use crate::core::clock::{ms_to_timestamp, Clock};
use crate::core::events::{ExecutionReportEvent, OrderEvent};
use crate::core::types::ExecutionStatus;

pub struct SimulatedExecutionEngine {
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl SimulatedExecutionEngine {
    pub fn new(bus: Arc<EventBus>, clock: Arc<dyn Clock>) -> Arc<Self> {
        let engine = Arc::new(Self {
            bus: Arc::clone(&bus),
            clock,
            subscriptions: Mutex::new(Vec::new()),
        });

        let weak: Weak<Self> = Arc::downgrade(&engine);
        let sub = bus.subscribe_to::<OrderEvent, _>(move |event| {
            if let Some(engine) = weak.upgrade() {
                engine.on_order(event);
            }
        });

        engine.subscriptions.lock().push(sub);
        engine
    }

    fn on_order(&self, event: &OrderEvent) {
        let order = &event.order;
        let timestamp = ms_to_timestamp(self.clock.now_ms());

        let ack = ExecutionReportEvent {
            order_id: order.id,
            status: ExecutionStatus::Accepted,
            filled_quantity: 0.0,
            fill_price: 0.0,
            timestamp,
            sequence_id: event.sequence_id,
        };
        self.bus.publish(&ack.into());

        let fill = ExecutionReportEvent {
            order_id: order.id,
            status: ExecutionStatus::Filled,
            filled_quantity: order.quantity,
            fill_price: order.price,
            timestamp,
            sequence_id: event.sequence_id,
        };
        self.bus.publish(&fill.into());
    }
}

impl Drop for SimulatedExecutionEngine {
    fn drop(&mut self) {
        for id in self.subscriptions.lock().drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}
