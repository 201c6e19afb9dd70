//! Market-data gateway
//!
//! Receives one UTF-8 JSON tick record per UDP datagram, advances the
//! simulation clock to the tick's own timestamp, and hands the resulting
//! [`MarketDataEvent`] to the injected sink. The clock advance strictly
//! precedes the sink call so that anything reading "now" while handling
//! the tick sees the tick's time.
//!
//! The socket carries a short receive timeout; a timeout just loops back
//! to re-check the stop flag, which is what keeps shutdown prompt. A
//! malformed or incomplete record is logged and skipped; the pipeline
//! never stalls on bad input. Any other socket error is fatal to the
//! receive loop.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use crate::core::clock::{ms_to_timestamp, SimulationClock};
use crate::core::events::{Event, MarketDataEvent};

const RECV_TIMEOUT: Duration = Duration::from_millis(100);
const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Where the gateway delivers parsed ticks: the orchestrator binds this to
/// the strategy loop's queue.
pub type EventSink = Arc<dyn Fn(Event) + Send + Sync>;

/// The wire record. Anything missing or unparseable fails the whole
/// record.
#[derive(Debug, Deserialize)]
struct TickRecord {
    timestamp_ms: i64,
    symbol: String,
    price: f64,
    volume: f64,
}

pub struct MarketDataGateway {
    socket: UdpSocket,
    clock: Arc<SimulationClock>,
    sink: EventSink,
    running: AtomicBool,
    sequence: AtomicU64,
}

impl MarketDataGateway {
    pub fn bind(clock: Arc<SimulationClock>, sink: EventSink, endpoint: &str) -> Result<Self> {
        let socket = UdpSocket::bind(endpoint)
            .with_context(|| format!("binding market data socket to {endpoint}"))?;
        socket
            .set_read_timeout(Some(RECV_TIMEOUT))
            .context("setting market data receive timeout")?;

        // Born running so a stop() issued before the receive thread gets
        // scheduled is never overwritten.
        Ok(Self {
            socket,
            clock,
            sink,
            running: AtomicBool::new(true),
            sequence: AtomicU64::new(0),
        })
    }

    /// Bound address, useful when the endpoint requested port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .context("reading market data socket address")
    }

    /// Blocking receive loop. Call from a dedicated thread; returns after
    /// [`Self::stop`] or on a fatal socket error.
    pub fn run(&self) {
        let mut buf = [0_u8; RECV_BUFFER_SIZE];

        while self.running.load(Ordering::Acquire) {
            let len = match self.socket.recv(&mut buf) {
                Ok(len) => len,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "market data socket failed, exiting receive loop");
                    break;
                }
            };

            self.handle_payload(&buf[..len]);
        }
    }

    /// Signal the receive loop to exit. It observes the flag within the
    /// receive timeout.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    fn handle_payload(&self, payload: &[u8]) {
        let record: TickRecord = match serde_json::from_slice(payload) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    error = %e,
                    payload = %String::from_utf8_lossy(payload),
                    "malformed tick record, skipping"
                );
                return;
            }
        };

        // Clock first, then the event: handlers of this tick must see the
        // tick's own time.
        self.clock.advance_to(record.timestamp_ms);

        let event = MarketDataEvent {
            symbol: record.symbol,
            price: record.price,
            quantity: record.volume,
            timestamp: ms_to_timestamp(record.timestamp_ms),
            sequence_id: self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
        };

        (self.sink)(event.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::Clock;
    use parking_lot::Mutex;
    use std::thread;

    fn harness() -> (
        Arc<MarketDataGateway>,
        Arc<SimulationClock>,
        Arc<Mutex<Vec<Event>>>,
        SocketAddr,
    ) {
        let clock = Arc::new(SimulationClock::new());
        let received = Arc::new(Mutex::new(Vec::new()));

        let sink_events = Arc::clone(&received);
        let sink: EventSink = Arc::new(move |event| sink_events.lock().push(event));

        let gateway =
            Arc::new(MarketDataGateway::bind(Arc::clone(&clock), sink, "127.0.0.1:0").unwrap());
        let addr = gateway.local_addr().unwrap();
        (gateway, clock, received, addr)
    }

    fn await_events(received: &Arc<Mutex<Vec<Event>>>, count: usize) -> bool {
        for _ in 0..200 {
            if received.lock().len() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_tick_parsed_and_clock_advanced() {
        let (gateway, clock, received, addr) = harness();

        let runner = Arc::clone(&gateway);
        let worker = thread::spawn(move || runner.run());

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(
                br#"{"timestamp_ms":1700000000123,"symbol":"AAPL","price":150.25,"volume":100.0}"#,
                addr,
            )
            .unwrap();

        assert!(await_events(&received, 1), "tick never arrived");

        gateway.stop();
        worker.join().unwrap();

        assert_eq!(clock.now_ms(), 1_700_000_000_123);

        let events = received.lock();
        let Event::MarketData(tick) = &events[0] else {
            panic!("expected market data event");
        };
        assert_eq!(tick.symbol, "AAPL");
        assert_eq!(tick.price, 150.25);
        assert_eq!(tick.quantity, 100.0);
        assert_eq!(tick.sequence_id, 1);
    }

    #[test]
    fn test_malformed_record_skipped_pipeline_continues() {
        let (gateway, clock, received, addr) = harness();

        let runner = Arc::clone(&gateway);
        let worker = thread::spawn(move || runner.run());

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"not json at all", addr).unwrap();
        sender
            .send_to(br#"{"symbol":"AAPL","price":1.0}"#, addr) // missing fields
            .unwrap();
        sender
            .send_to(
                br#"{"timestamp_ms":42,"symbol":"MSFT","price":400.0,"volume":10.0}"#,
                addr,
            )
            .unwrap();

        assert!(await_events(&received, 1), "good tick never arrived");

        gateway.stop();
        worker.join().unwrap();

        let events = received.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(clock.now_ms(), 42);
    }

    #[test]
    fn test_stop_terminates_run_promptly() {
        let (gateway, _clock, _received, _addr) = harness();

        let runner = Arc::clone(&gateway);
        let worker = thread::spawn(move || runner.run());

        thread::sleep(Duration::from_millis(20));
        gateway.stop();

        let started = std::time::Instant::now();
        worker.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
