//! Publish synthetic random-walk ticks at the engine's market-data
//! endpoint, one JSON record per datagram.

use anyhow::{Context, Result};
use clap::Parser;
use rand::Rng;
use serde_json::json;
use std::net::UdpSocket;
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::info;

use sedge_bins::common::{init_logging, shutdown_flag};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Destination market-data endpoint
    #[arg(short, long, default_value = "127.0.0.1:5555")]
    endpoint: String,

    /// Instrument symbol stamped on every tick
    #[arg(short, long, default_value = "AAPL")]
    symbol: String,

    /// Milliseconds between ticks
    #[arg(short, long, default_value = "100")]
    interval_ms: u64,

    /// Number of ticks to send; 0 means run until interrupted
    #[arg(short, long, default_value = "0")]
    count: u64,

    /// Starting price of the random walk
    #[arg(short, long, default_value = "150.0")]
    price: f64,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let socket = UdpSocket::bind("127.0.0.1:0").context("binding feeder socket")?;
    let shutdown = shutdown_flag()?;
    let mut rng = rand::thread_rng();

    let start_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);

    info!(
        endpoint = %args.endpoint,
        symbol = %args.symbol,
        interval_ms = args.interval_ms,
        "feeding ticks"
    );

    let mut price = args.price;
    let mut sent = 0_u64;
    while !shutdown.load(Ordering::Relaxed) && (args.count == 0 || sent < args.count) {
        // Bounded random walk, clamped away from zero so the threshold
        // strategy always has something to react to.
        price = (price + rng.gen_range(-0.25..0.25)).max(0.01);
        let volume: f64 = rng.gen_range(1.0..500.0);
        let timestamp_ms = start_ms + (sent * args.interval_ms) as i64;

        let record = json!({
            "timestamp_ms": timestamp_ms,
            "symbol": args.symbol,
            "price": (price * 100.0).round() / 100.0,
            "volume": volume.round(),
        });
        socket
            .send_to(record.to_string().as_bytes(), &args.endpoint)
            .with_context(|| format!("sending tick to {}", args.endpoint))?;

        sent += 1;
        std::thread::sleep(Duration::from_millis(args.interval_ms));
    }

    info!(sent, "feeder finished");
    Ok(())
}
