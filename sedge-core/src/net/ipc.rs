//! IPC server: telemetry publisher and command responder
//!
//! One worker thread services two UDP sockets. Each pass it drains the
//! telemetry queue, serializing order updates, position updates and risk
//! violations to JSON and firing them at the telemetry subscriber address,
//! then polls the command socket with a short timeout and answers PING /
//! STATUS / HALT requests through the injected handler.
//!
//! `push_telemetry` only enqueues and never blocks, so the risk thread is
//! never held up by a slow or absent telemetry consumer. After the loop
//! exits, the queue is drained once more so telemetry produced just before
//! shutdown still goes out.

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use serde_json::json;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::concurrent::EventQueue;
use crate::core::events::{
    Event, OrderUpdateEvent, PositionUpdateEvent, RiskViolationEvent,
};

const CMD_POLL_TIMEOUT: Duration = Duration::from_millis(50);
const CMD_BUFFER_SIZE: usize = 4 * 1024;

/// Handles one command payload and returns the JSON reply. Invoked on the
/// IPC thread, so implementations must be thread-safe.
pub type CommandHandler = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub struct IpcServer {
    handler: CommandHandler,
    cmd_socket: UdpSocket,
    pub_socket: UdpSocket,
    telemetry_dest: SocketAddr,
    telemetry: EventQueue<Event>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl IpcServer {
    /// Bind the command socket and resolve the telemetry destination. No
    /// thread is spawned until [`Self::start`].
    pub fn bind(
        handler: CommandHandler,
        cmd_endpoint: &str,
        telemetry_endpoint: &str,
    ) -> Result<Self> {
        let cmd_socket = UdpSocket::bind(cmd_endpoint)
            .with_context(|| format!("binding command socket to {cmd_endpoint}"))?;
        cmd_socket
            .set_read_timeout(Some(CMD_POLL_TIMEOUT))
            .context("setting command poll timeout")?;

        let pub_socket =
            UdpSocket::bind("0.0.0.0:0").context("binding telemetry publish socket")?;
        let telemetry_dest = telemetry_endpoint
            .to_socket_addrs()
            .with_context(|| format!("resolving telemetry endpoint {telemetry_endpoint}"))?
            .next()
            .ok_or_else(|| anyhow!("telemetry endpoint {telemetry_endpoint} resolved to nothing"))?;

        Ok(Self {
            handler,
            cmd_socket,
            pub_socket,
            telemetry_dest,
            telemetry: EventQueue::new(),
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// Bound command socket address, useful when the endpoint requested
    /// port 0.
    pub fn cmd_addr(&self) -> Result<SocketAddr> {
        self.cmd_socket
            .local_addr()
            .context("reading command socket address")
    }

    /// Spawn the worker thread. Idempotent.
    pub fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }

        self.running.store(true, Ordering::Release);
        let server = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name("ipc".to_string())
            .spawn(move || server.run())
            .expect("failed to spawn ipc thread");
        *worker = Some(handle);

        info!(telemetry = %self.telemetry_dest, "ipc server started");
    }

    /// Signal the worker to exit and join it. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }

    /// Enqueue an event for publication. Never blocks; safe from any
    /// thread. Events that are not telemetry-shaped are dropped at
    /// serialization time.
    pub fn push_telemetry(&self, event: Event) {
        self.telemetry.push(event);
    }

    fn run(&self) {
        while self.running.load(Ordering::Acquire) {
            self.process_telemetry();
            self.process_commands();
        }

        // Last drain so late telemetry is not silently lost.
        self.process_telemetry();
        info!("ipc server stopped");
    }

    fn process_telemetry(&self) {
        while let Some(event) = self.telemetry.try_pop() {
            let Some(payload) = format_telemetry(&event) else {
                continue;
            };
            if let Err(e) = self.pub_socket.send_to(payload.as_bytes(), self.telemetry_dest) {
                debug!(error = %e, "telemetry send failed, dropping record");
            }
        }
    }

    fn process_commands(&self) {
        let mut buf = [0_u8; CMD_BUFFER_SIZE];
        let (len, peer) = match self.cmd_socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return;
            }
            Err(e) => {
                error!(error = %e, "command socket failed, exiting ipc loop");
                self.running.store(false, Ordering::Release);
                return;
            }
        };

        let command = String::from_utf8_lossy(&buf[..len]);
        let response = (self.handler)(command.trim());

        if let Err(e) = self.cmd_socket.send_to(response.as_bytes(), peer) {
            warn!(error = %e, %peer, "failed to send command reply");
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Serialize a telemetry-shaped event to its wire record. Returns `None`
/// for event kinds the IPC surface does not publish.
pub fn format_telemetry(event: &Event) -> Option<String> {
    match event {
        Event::OrderUpdate(e) => Some(format_order_update(e)),
        Event::PositionUpdate(e) => Some(format_position_update(e)),
        Event::RiskViolation(e) => Some(format_risk_violation(e)),
        _ => None,
    }
}

fn format_order_update(e: &OrderUpdateEvent) -> String {
    json!({
        "type": "order_update",
        "order_id": e.order.id,
        "symbol": e.order.symbol,
        "side": e.order.side.as_str(),
        "status": e.order.status.as_str(),
        "previous_status": e.previous_status.as_str(),
        "quantity": e.order.quantity,
        "price": e.order.price,
        "filled_quantity": e.order.filled_quantity,
    })
    .to_string()
}

fn format_position_update(e: &PositionUpdateEvent) -> String {
    json!({
        "type": "position_update",
        "symbol": e.position.symbol,
        "net_quantity": e.position.net_quantity,
        "average_price": e.position.average_price,
        "realized_pnl": e.position.realized_pnl,
    })
    .to_string()
}

fn format_risk_violation(e: &RiskViolationEvent) -> String {
    json!({
        "type": "risk_violation",
        "symbol": e.symbol,
        "reason": e.reason,
        "current_value": e.current_value,
        "limit_value": e.limit_value,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ms_to_timestamp;
    use crate::core::types::{Order, OrderStatus, Position, Side};

    fn order_update() -> Event {
        let mut order = Order::new(5, "test", "AAPL", Side::Buy, 1.0, 150.25);
        order.status = OrderStatus::Filled;
        order.filled_quantity = 1.0;
        OrderUpdateEvent {
            order,
            previous_status: OrderStatus::Accepted,
            timestamp: ms_to_timestamp(1_000),
            sequence_id: 1,
        }
        .into()
    }

    #[test]
    fn test_order_update_record_shape() {
        let record = format_telemetry(&order_update()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&record).unwrap();

        assert_eq!(v["type"], "order_update");
        assert_eq!(v["order_id"], 5);
        assert_eq!(v["symbol"], "AAPL");
        assert_eq!(v["side"], "Buy");
        assert_eq!(v["status"], "Filled");
        assert_eq!(v["previous_status"], "Accepted");
        assert_eq!(v["quantity"], 1.0);
        assert_eq!(v["price"], 150.25);
        assert_eq!(v["filled_quantity"], 1.0);
    }

    #[test]
    fn test_position_update_record_shape() {
        let event: Event = PositionUpdateEvent {
            position: Position {
                symbol: "AAPL".to_string(),
                net_quantity: 7.0,
                average_price: 100.0,
                realized_pnl: 60.0,
            },
            timestamp: ms_to_timestamp(1_000),
            sequence_id: 1,
        }
        .into();

        let v: serde_json::Value =
            serde_json::from_str(&format_telemetry(&event).unwrap()).unwrap();
        assert_eq!(v["type"], "position_update");
        assert_eq!(v["symbol"], "AAPL");
        assert_eq!(v["net_quantity"], 7.0);
        assert_eq!(v["average_price"], 100.0);
        assert_eq!(v["realized_pnl"], 60.0);
    }

    #[test]
    fn test_risk_violation_record_shape() {
        let event: Event = RiskViolationEvent {
            symbol: "AAPL".to_string(),
            reason: "Max Drawdown Exceeded".to_string(),
            current_value: -501.0,
            limit_value: -500.0,
            timestamp: ms_to_timestamp(1_000),
            sequence_id: 1,
        }
        .into();

        let v: serde_json::Value =
            serde_json::from_str(&format_telemetry(&event).unwrap()).unwrap();
        assert_eq!(v["type"], "risk_violation");
        assert_eq!(v["reason"], "Max Drawdown Exceeded");
        assert_eq!(v["current_value"], -501.0);
        assert_eq!(v["limit_value"], -500.0);
    }

    #[test]
    fn test_non_telemetry_events_are_not_published() {
        use crate::core::events::MarketDataEvent;

        let event: Event = MarketDataEvent {
            symbol: "AAPL".to_string(),
            price: 1.0,
            quantity: 1.0,
            timestamp: ms_to_timestamp(1_000),
            sequence_id: 1,
        }
        .into();
        assert!(format_telemetry(&event).is_none());
    }

    #[test]
    fn test_command_round_trip_over_socket() {
        let handler: CommandHandler = Arc::new(|cmd| format!("echo:{cmd}"));
        let server = Arc::new(
            IpcServer::bind(handler, "127.0.0.1:0", "127.0.0.1:9").unwrap(),
        );
        let addr = server.cmd_addr().unwrap();
        server.start();

        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        client.send_to(b"PING", addr).unwrap();

        let mut buf = [0_u8; 1024];
        let (len, _) = client.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..len], b"echo:PING");

        server.stop();
    }

    #[test]
    fn test_telemetry_reaches_subscriber_socket() {
        let subscriber = UdpSocket::bind("127.0.0.1:0").unwrap();
        subscriber
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let telemetry_endpoint = subscriber.local_addr().unwrap().to_string();

        let handler: CommandHandler = Arc::new(|_| String::new());
        let server =
            Arc::new(IpcServer::bind(handler, "127.0.0.1:0", &telemetry_endpoint).unwrap());
        server.start();

        server.push_telemetry(order_update());

        let mut buf = [0_u8; 4096];
        let (len, _) = subscriber.recv_from(&mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(v["type"], "order_update");

        server.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let handler: CommandHandler = Arc::new(|_| String::new());
        let server = Arc::new(
            IpcServer::bind(handler, "127.0.0.1:0", "127.0.0.1:9").unwrap(),
        );
        server.stop();
        server.start();
        server.stop();
        server.stop();
    }
}
