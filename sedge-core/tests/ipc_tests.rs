//! Full-system test over real sockets: ticks in over UDP, telemetry out
//! over UDP, commands answered on the reply socket.

use std::net::UdpSocket;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sedge_core::{Clock, EngineConfig, SimulationClock, TradingEngine};

/// Grab an ephemeral local endpoint for the engine to bind.
fn free_udp_endpoint() -> String {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();
    drop(socket);
    addr.to_string()
}

fn send_command(cmd_endpoint: &str, command: &str) -> serde_json::Value {
    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    client.send_to(command.as_bytes(), cmd_endpoint).unwrap();

    let mut buf = [0_u8; 16 * 1024];
    let (len, _) = client.recv_from(&mut buf).unwrap();
    serde_json::from_slice(&buf[..len]).unwrap()
}

#[test]
fn test_engine_over_sockets_end_to_end() {
    // The telemetry subscriber binds first and stays bound; the engine
    // publishes records at this address.
    let subscriber = UdpSocket::bind("127.0.0.1:0").unwrap();
    subscriber
        .set_read_timeout(Some(Duration::from_millis(500)))
        .unwrap();

    let config = EngineConfig {
        market_data_endpoint: free_udp_endpoint(),
        command_endpoint: free_udp_endpoint(),
        telemetry_endpoint: subscriber.local_addr().unwrap().to_string(),
        ..EngineConfig::default()
    };
    let md_endpoint = config.market_data_endpoint.clone();
    let cmd_endpoint = config.command_endpoint.clone();

    let clock = Arc::new(SimulationClock::new());
    let mut engine = TradingEngine::new(Arc::clone(&clock), config);
    engine.start(None).unwrap();

    // One tick in at the market-data socket.
    let feeder = UdpSocket::bind("127.0.0.1:0").unwrap();
    feeder
        .send_to(
            br#"{"timestamp_ms":1700000000123,"symbol":"AAPL","price":150.25,"volume":100.0}"#,
            &md_endpoint,
        )
        .unwrap();

    // Telemetry out: collect records until the position update appears.
    let mut records = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut buf = [0_u8; 16 * 1024];
    while Instant::now() < deadline {
        match subscriber.recv_from(&mut buf) {
            Ok((len, _)) => {
                let record: serde_json::Value = serde_json::from_slice(&buf[..len]).unwrap();
                let done = record["type"] == "position_update";
                records.push(record);
                if done {
                    break;
                }
            }
            Err(_) => continue,
        }
    }

    let types: Vec<&str> = records
        .iter()
        .map(|r| r["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "order_update",
            "order_update",
            "order_update",
            "position_update"
        ],
        "unexpected telemetry stream: {records:?}"
    );

    let fill_update = &records[2];
    assert_eq!(fill_update["status"], "Filled");
    assert_eq!(fill_update["previous_status"], "Accepted");
    assert_eq!(fill_update["symbol"], "AAPL");

    let position = records.last().unwrap();
    assert_eq!(position["net_quantity"], 1.0);
    assert_eq!(position["average_price"], 150.25);
    assert_eq!(position["realized_pnl"], 0.0);

    // The gateway advanced the simulation clock to the tick's time.
    assert_eq!(clock.now_ms(), 1_700_000_000_123);

    // Command surface.
    let pong = send_command(&cmd_endpoint, "PING");
    assert_eq!(pong["status"], "ok");
    assert_eq!(pong["response"], "PONG");

    let status = send_command(&cmd_endpoint, "STATUS");
    assert_eq!(status["status"], "ok");
    assert_eq!(status["halted"], false);
    assert_eq!(status["positions"][0]["symbol"], "AAPL");

    let halt = send_command(&cmd_endpoint, "HALT");
    assert_eq!(halt["status"], "ok");
    assert_eq!(halt["response"], "Trading halted");

    let status = send_command(&cmd_endpoint, "STATUS");
    assert_eq!(status["halted"], true);

    let unknown = send_command(&cmd_endpoint, "SELFDESTRUCT");
    assert_eq!(unknown["status"], "error");
    assert_eq!(unknown["response"], "Unknown command: SELFDESTRUCT");

    engine.stop();
}

#[test]
fn test_no_orders_flow_past_a_halt() {
    let subscriber = UdpSocket::bind("127.0.0.1:0").unwrap();
    subscriber
        .set_read_timeout(Some(Duration::from_millis(300)))
        .unwrap();

    let config = EngineConfig {
        market_data_endpoint: free_udp_endpoint(),
        command_endpoint: free_udp_endpoint(),
        telemetry_endpoint: subscriber.local_addr().unwrap().to_string(),
        ..EngineConfig::default()
    };
    let md_endpoint = config.market_data_endpoint.clone();
    let cmd_endpoint = config.command_endpoint.clone();

    let clock = Arc::new(SimulationClock::new());
    let mut engine = TradingEngine::new(clock, config);
    engine.start(None).unwrap();

    let halt = send_command(&cmd_endpoint, "HALT");
    assert_eq!(halt["status"], "ok");

    // Ticks after the halt: signals are produced but die at the risk
    // engine, so no telemetry appears.
    let feeder = UdpSocket::bind("127.0.0.1:0").unwrap();
    for i in 0..3 {
        feeder
            .send_to(
                format!(
                    r#"{{"timestamp_ms":{},"symbol":"AAPL","price":150.0,"volume":1.0}}"#,
                    1_000 + i
                )
                .as_bytes(),
                &md_endpoint,
            )
            .unwrap();
    }

    let mut buf = [0_u8; 4096];
    assert!(
        subscriber.recv_from(&mut buf).is_err(),
        "telemetry observed after the kill switch latched"
    );

    engine.stop();
}
