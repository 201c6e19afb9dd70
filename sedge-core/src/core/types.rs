//! Domain types shared across the engine
//!
//! Orders are created by the risk engine, owned authoritatively by the order
//! tracker, and copied by value into every event that references them.
//! Positions are owned by the position engine; anything handed out is an
//! immutable snapshot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique order identifier, issued by [`crate::concurrent::OrderIdSource`].
pub type OrderId = u64;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Sign applied to a fill quantity: buys add, sells subtract.
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order lifecycle state.
///
/// `Filled`, `Canceled`, `Rejected` and `Expired` are terminal: once an
/// order reaches one of them, no further transition is legal and the
/// tracker drops the order from its active map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PendingNew,
    Accepted,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::PendingNew => "PendingNew",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::PartiallyFilled => "PartiallyFilled",
            OrderStatus::Filled => "Filled",
            OrderStatus::Canceled => "Canceled",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Expired => "Expired",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire-level outcome reported by the execution layer.
///
/// Mapped onto [`OrderStatus`] transitions by the order tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Accepted,
    Filled,
    Rejected,
}

impl ExecutionStatus {
    pub fn as_order_status(&self) -> OrderStatus {
        match self {
            ExecutionStatus::Accepted => OrderStatus::Accepted,
            ExecutionStatus::Filled => OrderStatus::Filled,
            ExecutionStatus::Rejected => OrderStatus::Rejected,
        }
    }
}

/// A single order.
///
/// Invariant (maintained by the tracker): for every non-terminal order,
/// `filled_quantity <= quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub strategy_id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub status: OrderStatus,
    pub filled_quantity: f64,
}

impl Order {
    /// A freshly created order: status `New`, nothing filled.
    pub fn new(
        id: OrderId,
        strategy_id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        quantity: f64,
        price: f64,
    ) -> Self {
        Self {
            id,
            strategy_id: strategy_id.into(),
            symbol: symbol.into(),
            side,
            quantity,
            price,
            status: OrderStatus::New,
            filled_quantity: 0.0,
        }
    }
}

/// Per-symbol net position with weighted average cost and realized PnL.
///
/// `net_quantity` is signed: positive long, negative short, zero flat.
/// While flat, `average_price` is meaningless and must not be consulted;
/// it is reassigned the next time the position opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub net_quantity: f64,
    pub average_price: f64,
    pub realized_pnl: f64,
}

impl Position {
    pub fn flat(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            net_quantity: 0.0,
            average_price: 0.0,
            realized_pnl: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.net_quantity == 0.0
    }
}

/// Engine-wide risk thresholds. Immutable after engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Cap on `|net_quantity| + order_quantity` per symbol. Hitting the cap
    /// exactly is allowed; exceeding it drops the signal.
    #[serde(default = "default_max_position")]
    pub max_position_per_symbol: f64,

    /// Floor on realized PnL (strictly negative). Crossing it publishes a
    /// risk violation and latches the kill switch.
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: f64,
}

fn default_max_position() -> f64 {
    1000.0
}

fn default_max_drawdown() -> f64 {
    -500.0
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_per_symbol: default_max_position(),
            max_drawdown: default_max_drawdown(),
        }
    }
}
