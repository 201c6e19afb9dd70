//! Domain model, event envelope and time sources.

pub mod clock;
pub mod events;
pub mod types;

pub use clock::{ms_to_timestamp, timestamp_to_ms, Clock, SimulationClock, Timestamp, WallClock};
pub use events::{
    Event, EventPayload, ExecutionReportEvent, FillEvent, HeartbeatEvent, MarketDataEvent,
    OrderEvent, OrderUpdateEvent, PositionUpdateEvent, RiskRejectEvent, RiskViolationEvent,
    SignalEvent,
};
pub use types::{ExecutionStatus, Order, OrderId, OrderStatus, Position, RiskLimits, Side};
