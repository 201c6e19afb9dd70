//! Warm-up reconciliation hook
//!
//! Before any worker thread starts, the orchestrator asks a [`Reconciler`]
//! for the positions and open orders that already exist at the exchange
//! and feeds them into the position engine's and order tracker's hydrate
//! paths. Implementations may block on I/O; both methods are called
//! exactly once, on the orchestrator thread.

use crate::core::types::{Order, Position};

pub trait Reconciler {
    fn reconcile_positions(&self) -> Vec<Position>;

    fn reconcile_orders(&self) -> Vec<Order>;
}

/// Reconciler over a fixed in-memory snapshot. Used by tests and by the
/// simulation runner to seed a known starting book.
#[derive(Debug, Default)]
pub struct StaticReconciler {
    positions: Vec<Position>,
    orders: Vec<Order>,
}

impl StaticReconciler {
    pub fn new(positions: Vec<Position>, orders: Vec<Order>) -> Self {
        Self { positions, orders }
    }

    pub fn with_positions(positions: Vec<Position>) -> Self {
        Self {
            positions,
            orders: Vec::new(),
        }
    }
}

impl Reconciler for StaticReconciler {
    fn reconcile_positions(&self) -> Vec<Position> {
        self.positions.clone()
    }

    fn reconcile_orders(&self) -> Vec<Order> {
        self.orders.clone()
    }
}
