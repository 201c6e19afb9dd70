//! Concurrency primitives: the cross-thread event queue and the order-id
//! source.

pub mod order_id;
pub mod queue;

pub use order_id::OrderIdSource;
pub use queue::EventQueue;
