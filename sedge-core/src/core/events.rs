//! The event envelope
//!
//! [`Event`] is the single sum type carried by every queue and bus in the
//! engine. Components communicate only by publishing and subscribing to
//! events; there is no direct strategy-to-execution call path and no
//! global mutable state.
//!
//! Every payload carries a [`Timestamp`] and a `sequence_id`. The sequence
//! id is assigned once at the edge (the market-data gateway) and
//! propagated unchanged through every transformation, so a tick, the
//! signal it produced, the resulting order and its fills can all be
//! correlated end to end.
//!
//! The legacy payloads (`Fill`, `Heartbeat`, `RiskReject`) are part of the
//! envelope for forward compatibility but are neither produced nor
//! consumed by the core pipeline.

use crate::core::clock::Timestamp;
use crate::core::types::{ExecutionStatus, Order, OrderId, OrderStatus, Position, Side};

/// A single market-data tick entering the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataEvent {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// A strategy's expression of intent to trade.
///
/// `price` carries the market price that triggered the signal; it flows
/// through the order to the simulated fill, which is what makes the
/// position engine's average-price and PnL arithmetic come out right.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    pub strategy_id: String,
    pub symbol: String,
    pub side: Side,
    pub strength: f64,
    pub price: f64,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// An order admitted by the risk engine, headed for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderEvent {
    pub order: Order,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// Snapshot of an order after a lifecycle transition.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdateEvent {
    pub order: Order,
    pub previous_status: OrderStatus,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// Wire-level report from the execution layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReportEvent {
    pub order_id: OrderId,
    pub status: ExecutionStatus,
    pub filled_quantity: f64,
    pub fill_price: f64,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// Snapshot of a position after a fill was applied.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdateEvent {
    pub position: Position,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// A post-trade limit breach. Latches the risk engine's kill switch.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskViolationEvent {
    pub symbol: String,
    pub reason: String,
    pub current_value: f64,
    pub limit_value: f64,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// Legacy: pre-trade rejection notice. Not produced by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRejectEvent {
    pub order_id: OrderId,
    pub reason: String,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// Legacy: standalone fill notice. Not produced by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct FillEvent {
    pub order_id: OrderId,
    pub symbol: String,
    pub fill_price: f64,
    pub fill_quantity: f64,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// Legacy: component liveness beacon. Not produced by the core.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatEvent {
    pub component_id: String,
    pub status: String,
    pub timestamp: Timestamp,
    pub sequence_id: u64,
}

/// The envelope carried by every queue and bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    MarketData(MarketDataEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    OrderUpdate(OrderUpdateEvent),
    RiskReject(RiskRejectEvent),
    Fill(FillEvent),
    Heartbeat(HeartbeatEvent),
    ExecutionReport(ExecutionReportEvent),
    PositionUpdate(PositionUpdateEvent),
    RiskViolation(RiskViolationEvent),
}

impl Event {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            Event::MarketData(e) => e.timestamp,
            Event::Signal(e) => e.timestamp,
            Event::Order(e) => e.timestamp,
            Event::OrderUpdate(e) => e.timestamp,
            Event::RiskReject(e) => e.timestamp,
            Event::Fill(e) => e.timestamp,
            Event::Heartbeat(e) => e.timestamp,
            Event::ExecutionReport(e) => e.timestamp,
            Event::PositionUpdate(e) => e.timestamp,
            Event::RiskViolation(e) => e.timestamp,
        }
    }

    pub fn sequence_id(&self) -> u64 {
        match self {
            Event::MarketData(e) => e.sequence_id,
            Event::Signal(e) => e.sequence_id,
            Event::Order(e) => e.sequence_id,
            Event::OrderUpdate(e) => e.sequence_id,
            Event::RiskReject(e) => e.sequence_id,
            Event::Fill(e) => e.sequence_id,
            Event::Heartbeat(e) => e.sequence_id,
            Event::ExecutionReport(e) => e.sequence_id,
            Event::PositionUpdate(e) => e.sequence_id,
            Event::RiskViolation(e) => e.sequence_id,
        }
    }
}

/// Extraction of a concrete payload from the envelope. The typed
/// subscription mode of the event bus is built on this.
pub trait EventPayload: Sized {
    fn from_event(event: &Event) -> Option<&Self>;
    fn into_event(self) -> Event;
}

macro_rules! impl_event_payload {
    ($payload:ty, $variant:ident) => {
        impl EventPayload for $payload {
            fn from_event(event: &Event) -> Option<&Self> {
                match event {
                    Event::$variant(e) => Some(e),
                    _ => None,
                }
            }

            fn into_event(self) -> Event {
                Event::$variant(self)
            }
        }

        impl From<$payload> for Event {
            fn from(payload: $payload) -> Event {
                Event::$variant(payload)
            }
        }
    };
}

impl_event_payload!(MarketDataEvent, MarketData);
impl_event_payload!(SignalEvent, Signal);
impl_event_payload!(OrderEvent, Order);
impl_event_payload!(OrderUpdateEvent, OrderUpdate);
impl_event_payload!(RiskRejectEvent, RiskReject);
impl_event_payload!(FillEvent, Fill);
impl_event_payload!(HeartbeatEvent, Heartbeat);
impl_event_payload!(ExecutionReportEvent, ExecutionReport);
impl_event_payload!(PositionUpdateEvent, PositionUpdate);
impl_event_payload!(RiskViolationEvent, RiskViolation);
