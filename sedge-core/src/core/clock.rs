//! Time sources and timestamp conversions
//!
//! Every component that stamps an event reads "now" through the [`Clock`]
//! trait. Live runs use [`WallClock`]; backtests use [`SimulationClock`],
//! which the market-data gateway advances to each tick's own timestamp
//! before the tick enters the pipeline. That ordering means any handler
//! reading the clock while processing a tick sees that tick's time.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Event timestamp type. Converted to and from epoch milliseconds with
/// [`ms_to_timestamp`] / [`timestamp_to_ms`].
pub type Timestamp = SystemTime;

/// Read-only "now in epoch milliseconds".
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// System wall clock.
#[derive(Debug, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now_ms(&self) -> i64 {
        timestamp_to_ms(SystemTime::now())
    }
}

/// Externally driven simulation clock.
///
/// Single writer (the market-data gateway), many readers. The engine does
/// not own this clock; it is created by the caller and shared so that a
/// backtest harness can also read it.
#[derive(Debug, Default)]
pub struct SimulationClock {
    current_ms: AtomicI64,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: i64) -> Self {
        Self {
            current_ms: AtomicI64::new(ms),
        }
    }

    /// Set simulated time. Callers pass each tick's `timestamp_ms`; the
    /// clock does not enforce monotonicity.
    pub fn advance_to(&self, ms: i64) {
        self.current_ms.store(ms, Ordering::Release);
    }
}

impl Clock for SimulationClock {
    fn now_ms(&self) -> i64 {
        self.current_ms.load(Ordering::Acquire)
    }
}

/// Epoch milliseconds to [`Timestamp`].
pub fn ms_to_timestamp(ms: i64) -> Timestamp {
    if ms >= 0 {
        UNIX_EPOCH + Duration::from_millis(ms as u64)
    } else {
        UNIX_EPOCH - Duration::from_millis(ms.unsigned_abs())
    }
}

/// [`Timestamp`] to epoch milliseconds.
pub fn timestamp_to_ms(ts: Timestamp) -> i64 {
    match ts.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}
