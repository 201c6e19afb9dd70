//! Lifecycle laws: idempotent start and stop, restartability, and RAII
//! teardown.

use std::sync::Arc;
use std::time::Duration;

use sedge_core::core::events::PositionUpdateEvent;
use sedge_core::testing::{make_tick, Recorder};
use sedge_core::{EngineConfig, SimulationClock, TradingEngine};

const WAIT: Duration = Duration::from_secs(2);

fn new_engine() -> TradingEngine {
    let clock = Arc::new(SimulationClock::new());
    TradingEngine::new(clock, EngineConfig::isolated())
}

#[test]
fn test_double_start_is_a_noop() {
    let mut engine = new_engine();
    engine.start(None).unwrap();
    engine.start(None).unwrap();
    assert!(engine.is_running());
    engine.stop();
}

#[test]
fn test_stop_without_start_and_double_stop() {
    let mut engine = new_engine();
    engine.stop();
    assert!(!engine.is_running());

    engine.start(None).unwrap();
    engine.stop();
    engine.stop();
    assert!(!engine.is_running());
}

#[test]
fn test_restart_runs_a_working_pipeline() {
    let mut engine = new_engine();

    engine.start(None).unwrap();
    engine.stop();

    // Second run must behave like the first: fresh subscribers, no
    // duplicated bridges from the earlier start.
    engine.start(None).unwrap();
    let recorder = Recorder::attach(engine.risk_bus());
    engine.push_market_data(make_tick("AAPL", 150.0, 1));

    assert!(
        recorder.wait_until(WAIT, |r| r.count_of::<PositionUpdateEvent>() >= 1),
        "pipeline dead after restart"
    );

    // Exactly one position update per fill: a duplicated bridge would
    // deliver the fill twice.
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(recorder.count_of::<PositionUpdateEvent>(), 1);

    engine.stop();
}

#[test]
fn test_drop_stops_threads() {
    let mut engine = new_engine();
    engine.start(None).unwrap();
    engine.push_market_data(make_tick("GOOG", 175.0, 1));
    std::thread::sleep(Duration::from_millis(50));
    // Dropping a running engine must join all workers without hanging or
    // panicking.
    drop(engine);
}

#[test]
fn test_bus_accessors_allow_external_observers() {
    let mut engine = new_engine();
    let strategy_recorder = Recorder::attach(engine.strategy_bus());
    let risk_recorder = Recorder::attach(engine.risk_bus());

    engine.start(None).unwrap();
    engine.push_market_data(make_tick("TSLA", 237.5, 1));

    assert!(
        risk_recorder.wait_until(WAIT, |r| r.count_of::<PositionUpdateEvent>() >= 1),
        "risk bus observer saw nothing"
    );
    assert!(
        !strategy_recorder.is_empty(),
        "strategy bus observer saw nothing"
    );

    engine.stop();
}

#[test]
fn test_events_after_stop_go_nowhere() {
    let mut engine = new_engine();
    engine.start(None).unwrap();
    engine.stop();

    let recorder = Recorder::attach(engine.risk_bus());
    engine.push_market_data(make_tick("AAPL", 150.0, 1));
    std::thread::sleep(Duration::from_millis(100));
    assert!(recorder.is_empty());
}
