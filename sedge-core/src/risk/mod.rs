//! The risk side of the pipeline: order lifecycle tracking, position and
//! PnL accounting, pre-trade checks, the kill switch, and the warm-up
//! reconciliation hook.

pub mod order_tracker;
pub mod position_engine;
pub mod reconciler;
pub mod risk_engine;

pub use order_tracker::{check_transition, OrderTracker, TransitionError};
pub use position_engine::{apply_fill, PositionEngine};
pub use reconciler::{Reconciler, StaticReconciler};
pub use risk_engine::RiskEngine;
