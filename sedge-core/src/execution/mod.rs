//! Execution layer. The only implementation is the deterministic
//! simulator; a live broker adapter would subscribe to the same
//! order-routing bus and publish the same reports.

pub mod simulated;

pub use simulated::SimulatedExecutionEngine;
