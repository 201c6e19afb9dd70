//! Order lifecycle state machine and active-order map
//!
//! Subscribes to `OrderEvent` and `ExecutionReportEvent` on the risk bus,
//! in that order, and owns the authoritative copy of every non-terminal
//! order. Each accepted transition publishes an [`OrderUpdateEvent`]
//! carrying the fresh snapshot and the previous status; reaching a
//! terminal status removes the order from the map.
//!
//! Legal transitions:
//!
//! ```text
//! New             -> PendingNew | Accepted | Rejected
//! PendingNew      -> Accepted | Rejected
//! Accepted        -> PartiallyFilled | Filled | Canceled | Rejected
//! PartiallyFilled -> PartiallyFilled | Filled | Canceled
//! Filled / Canceled / Rejected / Expired -> (terminal, no exits)
//! ```
//!
//! Reports that reference an unknown order id or propose an illegal
//! transition are logged and dropped; nothing is mutated and no event is
//! generated from them.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::warn;

use crate::bus::{EventBus, SubscriptionId};
use crate::core::events::{ExecutionReportEvent, OrderEvent, OrderUpdateEvent};
use crate::core::types::{ExecutionStatus, Order, OrderId, OrderStatus};

/// An execution report proposed a transition the state machine forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal order transition {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for TransitionError {}

/// Validate a proposed lifecycle transition.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), TransitionError> {
    use OrderStatus::*;

    let allowed = match from {
        New => matches!(to, PendingNew | Accepted | Rejected),
        PendingNew => matches!(to, Accepted | Rejected),
        Accepted => matches!(to, PartiallyFilled | Filled | Canceled | Rejected),
        PartiallyFilled => matches!(to, PartiallyFilled | Filled | Canceled),
        Filled | Canceled | Rejected | Expired => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(TransitionError { from, to })
    }
}

pub struct OrderTracker {
    bus: Arc<EventBus>,
    active: Mutex<HashMap<OrderId, Order>>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl OrderTracker {
    /// Create the tracker and register its two subscriptions on `bus`.
    /// Registration order matters to downstream components: the tracker
    /// must be constructed before the position engine so its handlers run
    /// first for the same event.
    pub fn new(bus: Arc<EventBus>) -> Arc<Self> {
        let tracker = Arc::new(Self {
            bus: Arc::clone(&bus),
            active: Mutex::new(HashMap::new()),
            subscriptions: Mutex::new(Vec::new()),
        });

        let weak: Weak<Self> = Arc::downgrade(&tracker);
        let order_sub = bus.subscribe_to::<OrderEvent, _>(move |event| {
            if let Some(tracker) = weak.upgrade() {
                tracker.on_order(event);
            }
        });

        let weak: Weak<Self> = Arc::downgrade(&tracker);
        let report_sub = bus.subscribe_to::<ExecutionReportEvent, _>(move |event| {
            if let Some(tracker) = weak.upgrade() {
                tracker.on_execution_report(event);
            }
        });

        tracker
            .subscriptions
            .lock()
            .extend([order_sub, report_sub]);
        tracker
    }

    /// Warm-up only: insert or overwrite an order recovered from the
    /// exchange, accepting its status as authoritative. Publishes nothing.
    /// Must not be called once the engine is running.
    pub fn hydrate(&self, order: Order) {
        self.active.lock().insert(order.id, order);
    }

    /// Number of non-terminal orders currently tracked.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// Snapshot of one active order, if present.
    pub fn active_order(&self, id: OrderId) -> Option<Order> {
        self.active.lock().get(&id).cloned()
    }

    fn on_order(&self, event: &OrderEvent) {
        let mut order = event.order.clone();
        // The tracker admits every order as New with nothing filled,
        // whatever the producer put in the event.
        order.status = OrderStatus::New;
        order.filled_quantity = 0.0;

        self.active.lock().insert(order.id, order.clone());

        self.bus.publish(
            &OrderUpdateEvent {
                order,
                previous_status: OrderStatus::New,
                timestamp: event.timestamp,
                sequence_id: event.sequence_id,
            }
            .into(),
        );
    }

    fn on_execution_report(&self, event: &ExecutionReportEvent) {
        let update = {
            let mut active = self.active.lock();

            let Some(order) = active.get_mut(&event.order_id) else {
                warn!(
                    order_id = event.order_id,
                    "execution report for unknown order, dropping"
                );
                return;
            };

            let previous = order.status;
            let proposed = event.status.as_order_status();

            if let Err(err) = check_transition(previous, proposed) {
                warn!(order_id = event.order_id, %err, "dropping execution report");
                return;
            }

            order.status = proposed;
            if event.status == ExecutionStatus::Filled {
                order.filled_quantity = event.filled_quantity;
            }

            let snapshot = order.clone();
            if proposed.is_terminal() {
                active.remove(&event.order_id);
            }

            OrderUpdateEvent {
                order: snapshot,
                previous_status: previous,
                timestamp: event.timestamp,
                sequence_id: event.sequence_id,
            }
        };

        self.bus.publish(&update.into());
    }
}

impl Drop for OrderTracker {
    fn drop(&mut self) {
        for id in self.subscriptions.lock().drain(..) {
            self.bus.unsubscribe(id);
        }
    }
}
