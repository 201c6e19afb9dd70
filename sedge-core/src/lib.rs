//! Sedge - event-driven trading engine core
//!
//! A multi-threaded pipeline that consumes market-data ticks, lets a
//! pluggable strategy emit trade signals, screens them through pre-trade
//! and post-trade risk checks, routes approved orders to a simulated
//! execution layer, tracks each order's lifecycle, maintains per-symbol
//! positions with realized-PnL accounting, and exposes telemetry plus
//! operator commands over local sockets.
//!
//! ## Architecture
//!
//! ```text
//!  tick (UDP)          signal              order            reports
//! ┌───────────┐   ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ market    │──▶│ strategy loop │──▶│  risk loop  │──▶│ order-routing │
//! │ data      │   │  (strategy    │   │ (tracker,   │   │  (simulated   │
//! │ gateway   │   │   host)       │   │  positions, │◀──│   execution)  │
//! └───────────┘   └──────────────┘   │  risk engine)│   └──────────────┘
//!       │                            └──────┬──────┘
//!  advances the                             │ order/position/violation
//!  simulation clock                         ▼
//!                                    ┌─────────────┐
//!                                    │ ipc server  │──▶ telemetry (UDP)
//!                                    │             │◀─▶ PING/STATUS/HALT
//!                                    └─────────────┘
//! ```
//!
//! Each loop owns one queue and one bus; callbacks on a bus run serialized
//! on that loop's thread, and events cross threads only through queue
//! bridges installed by the orchestrator. See [`engine::TradingEngine`]
//! for the full wiring and lifecycle.
//!
//! ## Determinism
//!
//! Backtests drive a [`core::SimulationClock`] from the tick stream, so
//! fill timestamps follow historical time instead of the wall clock.
//! Thread scheduling can still reorder independent events from different
//! producers; tests that need strict determinism drive `push_event`
//! directly or assert only scheduling-invariant properties.

pub mod bus;
pub mod concurrent;
pub mod config;
pub mod core;
pub mod engine;
pub mod execution;
pub mod net;
pub mod risk;
pub mod strategy;
pub mod testing;
pub mod utils;

pub use crate::bus::{EventBus, SubscriptionId};
pub use crate::concurrent::{EventQueue, OrderIdSource};
pub use crate::config::EngineConfig;
pub use crate::core::{
    Clock, Event, ExecutionStatus, MarketDataEvent, Order, OrderId, OrderStatus, Position,
    RiskLimits, Side, SignalEvent, SimulationClock, WallClock,
};
pub use crate::engine::TradingEngine;
pub use crate::risk::{Reconciler, StaticReconciler};
pub use crate::strategy::{Strategy, ThresholdStrategy};
