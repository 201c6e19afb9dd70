//! Trading engine orchestrator
//!
//! [`TradingEngine`] constructs every component, wires the cross-thread
//! bridges, runs the warm-up reconciliation gate, starts the threads in
//! the required order and tears everything down in reverse.
//!
//! Thread layout while running:
//!
//! ```text
//! strategy loop     strategy host callbacks (tick -> signal)
//! risk loop         order tracker + position engine + risk engine
//! order-routing     simulated execution engine
//! market-data       gateway receive loop
//! ipc               telemetry publisher + command responder
//! caller            start() / stop() / push_event()
//! ```
//!
//! Bridges (a subscriber on one bus that enqueues into another loop's
//! queue):
//!
//! ```text
//! 1. strategy bus  --SignalEvent--------->  risk queue
//! 2. risk bus      --OrderEvent---------->  order-routing queue
//! 3. routing bus   --ExecutionReportEvent-> risk queue
//!    risk bus      --telemetry events----->  ipc queue
//! ```
//!
//! Startup order is load-bearing. The tracker is constructed before the
//! position engine so its handlers run first for the same event on the
//! risk bus, and market data starts last so every subscriber is live
//! before the first tick enters the pipeline. Shutdown is the exact
//! reverse so no stranded event is observed downstream.

pub mod event_loop;

use anyhow::Result;
use serde_json::json;
use std::sync::{Arc, Weak};
use tracing::{info, warn};

use crate::bus::{EventBus, SubscriptionId};
use crate::concurrent::OrderIdSource;
use crate::config::EngineConfig;
use crate::core::clock::{Clock, SimulationClock};
use crate::core::events::{
    Event, ExecutionReportEvent, MarketDataEvent, OrderEvent, OrderUpdateEvent,
    PositionUpdateEvent, RiskViolationEvent, SignalEvent,
};
use crate::core::types::RiskLimits;
use crate::net::{CommandHandler, EventSink, IpcServer, MarketDataThread, OrderRoutingThread};
use crate::risk::{OrderTracker, PositionEngine, Reconciler, RiskEngine};
use crate::strategy::{Strategy, StrategyHost, ThresholdStrategy};

pub use event_loop::EventLoop;

pub struct TradingEngine {
    config: EngineConfig,
    sim_clock: Arc<SimulationClock>,
    order_ids: Arc<OrderIdSource>,
    limits: RiskLimits,
    strategy: Arc<dyn Strategy>,

    strategy_loop: EventLoop,
    risk_loop: EventLoop,
    routing: OrderRoutingThread,

    market_data: Option<MarketDataThread>,
    ipc: Option<Arc<IpcServer>>,

    tracker: Option<Arc<OrderTracker>>,
    positions: Option<Arc<PositionEngine>>,
    risk: Option<Arc<RiskEngine>>,
    strategy_host: Option<Arc<StrategyHost>>,

    bridges: Vec<(Arc<EventBus>, SubscriptionId)>,
    running: bool,
}

impl TradingEngine {
    /// Construct an engine bound to `sim_clock`. No threads are spawned
    /// and no sockets are opened until [`Self::start`].
    pub fn new(sim_clock: Arc<SimulationClock>, config: EngineConfig) -> Self {
        let limits = config.risk;
        let strategy: Arc<dyn Strategy> = Arc::new(ThresholdStrategy::new(
            config.strategy.strategy_id.clone(),
            config.strategy.price_threshold,
        ));
        let routing_clock: Arc<dyn Clock> = sim_clock.clone() as Arc<dyn Clock>;

        Self {
            config,
            sim_clock,
            order_ids: Arc::new(OrderIdSource::new()),
            limits,
            strategy,
            strategy_loop: EventLoop::new("strategy"),
            risk_loop: EventLoop::new("risk"),
            routing: OrderRoutingThread::new(routing_clock),
            market_data: None,
            ipc: None,
            tracker: None,
            positions: None,
            risk: None,
            strategy_host: None,
            bridges: Vec::new(),
            running: false,
        }
    }

    /// Replace the default threshold strategy. Takes effect at the next
    /// `start`.
    pub fn set_strategy(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategy = strategy;
    }

    /// Bring the engine to a running state. If a reconciler is supplied,
    /// the warm-up gate hydrates positions and open orders before any
    /// worker thread exists. Idempotent.
    pub fn start(&mut self, reconciler: Option<&dyn Reconciler>) -> Result<()> {
        if self.running {
            return Ok(());
        }

        // 1. Stateful components, tracker first. Their subscription order
        //    on the risk bus is the intra-event handler order.
        let tracker = OrderTracker::new(Arc::clone(self.risk_loop.bus()));
        let positions = PositionEngine::new(Arc::clone(self.risk_loop.bus()), self.limits);

        // 2. Warm-up gate, single-threaded: no loop is running yet.
        if let Some(reconciler) = reconciler {
            let seed_positions = reconciler.reconcile_positions();
            let seed_orders = reconciler.reconcile_orders();
            info!(
                positions = seed_positions.len(),
                orders = seed_orders.len(),
                "reconciling prior exchange state"
            );
            for position in seed_positions {
                positions.hydrate(position);
            }
            for order in seed_orders {
                tracker.hydrate(order);
            }
        }

        self.tracker = Some(tracker);
        self.positions = Some(Arc::clone(&positions));

        // 3. Core loops.
        self.strategy_loop.start();
        self.risk_loop.start();

        // 4. Bridge 1: signals cross from the strategy thread to risk.
        let risk_queue = self.risk_loop.queue();
        let bridge = self
            .strategy_loop
            .bus()
            .subscribe_to::<SignalEvent, _>(move |signal| {
                risk_queue.push(signal.clone().into());
            });
        self.bridges
            .push((Arc::clone(self.strategy_loop.bus()), bridge));

        // 5. Order routing, which constructs the execution engine on its
        //    own bus.
        self.routing.start();

        // 6. Bridge 2: admitted orders leave the risk thread for routing.
        //    Registered after the tracker's and position engine's
        //    OrderEvent handlers, so both have run before the order is
        //    forwarded.
        let routing_queue = self.routing.queue();
        let bridge = self
            .risk_loop
            .bus()
            .subscribe_to::<OrderEvent, _>(move |order| {
                routing_queue.push(order.clone().into());
            });
        self.bridges.push((Arc::clone(self.risk_loop.bus()), bridge));

        // 7. Bridge 3: execution reports come back to the risk thread.
        let risk_queue = self.risk_loop.queue();
        let bridge =
            self.routing
                .bus()
                .subscribe_to::<ExecutionReportEvent, _>(move |report| {
                    risk_queue.push(report.clone().into());
                });
        self.bridges.push((Arc::clone(self.routing.bus()), bridge));

        // 8. Strategy, then the risk engine that consumes its signals.
        self.strategy_host = Some(StrategyHost::new(
            Arc::clone(self.strategy_loop.bus()),
            Arc::clone(&self.strategy),
        ));
        let risk = RiskEngine::new(
            Arc::clone(self.risk_loop.bus()),
            Arc::clone(&self.order_ids),
            Arc::clone(&positions),
            self.limits,
        );
        self.risk = Some(Arc::clone(&risk));

        // 9. IPC server and telemetry bridges.
        if !self.config.command_endpoint.is_empty() && !self.config.telemetry_endpoint.is_empty() {
            let handler = make_command_handler(Arc::clone(&risk), Arc::clone(&positions));
            let ipc = Arc::new(IpcServer::bind(
                handler,
                &self.config.command_endpoint,
                &self.config.telemetry_endpoint,
            )?);
            ipc.start();
            self.install_telemetry_bridges(&ipc);
            self.ipc = Some(ipc);
        }

        // 10. Market data last: every subscriber is live before the first
        //     tick enters the pipeline.
        if !self.config.market_data_endpoint.is_empty() {
            let strategy_queue = self.strategy_loop.queue();
            let sink: EventSink = Arc::new(move |event| strategy_queue.push(event));
            let mut market_data = MarketDataThread::new(
                Arc::clone(&self.sim_clock),
                sink,
                self.config.market_data_endpoint.clone(),
            );
            market_data.start()?;
            self.market_data = Some(market_data);
        }

        self.running = true;
        info!("trading engine started");
        Ok(())
    }

    /// Tear down in the exact reverse of `start`. Idempotent. Also safe
    /// after a partially failed `start`: every step below tolerates its
    /// piece being absent.
    pub fn stop(&mut self) {
        if !self.running && self.tracker.is_none() {
            return;
        }

        // No new ticks, then no command handlers racing teardown.
        if let Some(mut market_data) = self.market_data.take() {
            market_data.stop();
        }
        if let Some(ipc) = self.ipc.take() {
            ipc.stop();
        }

        // Logic components in reverse construction order; each
        // unsubscribes from its bus as it drops.
        self.risk = None;
        self.positions = None;
        self.tracker = None;
        self.strategy_host = None;

        for (bus, id) in self.bridges.drain(..) {
            bus.unsubscribe(id);
        }

        self.routing.stop();
        self.risk_loop.stop();
        self.strategy_loop.stop();

        self.running = false;
        info!("trading engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Enqueue an event at the head of the pipeline (the strategy loop).
    /// Safe from any thread. This is also the gateway's sink in live mode.
    pub fn push_event(&self, event: Event) {
        self.strategy_loop.push(event);
    }

    /// Convenience wrapper for the common test input.
    pub fn push_market_data(&self, tick: MarketDataEvent) {
        self.push_event(tick.into());
    }

    /// Bus accessors so tests and external observers can subscribe.
    pub fn strategy_bus(&self) -> &Arc<EventBus> {
        self.strategy_loop.bus()
    }

    pub fn risk_bus(&self) -> &Arc<EventBus> {
        self.risk_loop.bus()
    }

    /// Execute an operator command against the running engine. The IPC
    /// server routes its requests here; tests may call it directly.
    pub fn execute_command(&self, command: &str) -> String {
        match (&self.risk, &self.positions) {
            (Some(risk), Some(positions)) => dispatch_command(risk, positions, command),
            _ => json!({
                "status": "error",
                "response": "Engine is not running",
            })
            .to_string(),
        }
    }

    fn install_telemetry_bridges(&mut self, ipc: &Arc<IpcServer>) {
        let bus = Arc::clone(self.risk_loop.bus());

        let weak: Weak<IpcServer> = Arc::downgrade(ipc);
        let id = bus.subscribe_to::<OrderUpdateEvent, _>(move |event| {
            if let Some(ipc) = weak.upgrade() {
                ipc.push_telemetry(event.clone().into());
            }
        });
        self.bridges.push((Arc::clone(&bus), id));

        let weak: Weak<IpcServer> = Arc::downgrade(ipc);
        let id = bus.subscribe_to::<PositionUpdateEvent, _>(move |event| {
            if let Some(ipc) = weak.upgrade() {
                ipc.push_telemetry(event.clone().into());
            }
        });
        self.bridges.push((Arc::clone(&bus), id));

        let weak: Weak<IpcServer> = Arc::downgrade(ipc);
        let id = bus.subscribe_to::<RiskViolationEvent, _>(move |event| {
            if let Some(ipc) = weak.upgrade() {
                ipc.push_telemetry(event.clone().into());
            }
        });
        self.bridges.push((bus, id));
    }
}

impl Drop for TradingEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build the thread-safe command handler the IPC server invokes. Captures
/// its components by `Arc`; the orchestrator drops the server before the
/// components, so the handler never outlives a live engine's teardown
/// order.
fn make_command_handler(risk: Arc<RiskEngine>, positions: Arc<PositionEngine>) -> CommandHandler {
    Arc::new(move |command| dispatch_command(&risk, &positions, command))
}

fn dispatch_command(risk: &RiskEngine, positions: &PositionEngine, command: &str) -> String {
    match command {
        "PING" => json!({
            "status": "ok",
            "response": "PONG",
        })
        .to_string(),

        "STATUS" => {
            let snapshots: Vec<_> = positions
                .snapshots()
                .into_iter()
                .map(|p| {
                    json!({
                        "symbol": p.symbol,
                        "net_quantity": p.net_quantity,
                        "average_price": p.average_price,
                        "realized_pnl": p.realized_pnl,
                    })
                })
                .collect();
            json!({
                "status": "ok",
                "halted": risk.is_halted(),
                "positions": snapshots,
            })
            .to_string()
        }

        "HALT" => {
            risk.halt_trading();
            json!({
                "status": "ok",
                "response": "Trading halted",
            })
            .to_string()
        }

        other => {
            warn!(command = other, "unknown ipc command");
            json!({
                "status": "error",
                "response": format!("Unknown command: {other}"),
            })
            .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::make_position;

    fn running_engine() -> TradingEngine {
        let clock = Arc::new(SimulationClock::new());
        let mut engine = TradingEngine::new(clock, EngineConfig::isolated());
        engine.start(None).unwrap();
        engine
    }

    #[test]
    fn test_ping_command() {
        let engine = running_engine();
        let reply: serde_json::Value =
            serde_json::from_str(&engine.execute_command("PING")).unwrap();
        assert_eq!(reply["status"], "ok");
        assert_eq!(reply["response"], "PONG");
    }

    #[test]
    fn test_status_command_reports_positions_and_halt() {
        let clock = Arc::new(SimulationClock::new());
        let mut engine = TradingEngine::new(clock, EngineConfig::isolated());
        let reconciler = crate::risk::StaticReconciler::with_positions(vec![make_position(
            "AAPL", 3.0, 100.0, 12.5,
        )]);
        engine.start(Some(&reconciler)).unwrap();

        let reply: serde_json::Value =
            serde_json::from_str(&engine.execute_command("STATUS")).unwrap();
        assert_eq!(reply["status"], "ok");
        assert_eq!(reply["halted"], false);
        assert_eq!(reply["positions"][0]["symbol"], "AAPL");
        assert_eq!(reply["positions"][0]["net_quantity"], 3.0);
    }

    #[test]
    fn test_halt_command_latches_kill_switch() {
        let engine = running_engine();

        let reply: serde_json::Value =
            serde_json::from_str(&engine.execute_command("HALT")).unwrap();
        assert_eq!(reply["status"], "ok");
        assert_eq!(reply["response"], "Trading halted");

        let status: serde_json::Value =
            serde_json::from_str(&engine.execute_command("STATUS")).unwrap();
        assert_eq!(status["halted"], true);
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let engine = running_engine();
        let reply: serde_json::Value =
            serde_json::from_str(&engine.execute_command("REBOOT")).unwrap();
        assert_eq!(reply["status"], "error");
        assert_eq!(reply["response"], "Unknown command: REBOOT");
    }

    #[test]
    fn test_commands_against_stopped_engine() {
        let clock = Arc::new(SimulationClock::new());
        let engine = TradingEngine::new(clock, EngineConfig::isolated());
        let reply: serde_json::Value =
            serde_json::from_str(&engine.execute_command("PING")).unwrap();
        assert_eq!(reply["status"], "error");
    }
}
