//! Test support: event builders and a recording bus observer. Compiled
//! unconditionally so integration tests and downstream crates can use it.

pub mod helpers;

pub use helpers::{make_order, make_position, make_signal, make_tick, Recorder};
