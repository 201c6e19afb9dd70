//! Run the trading engine against a simulated clock until SIGINT/SIGTERM.
//!
//! Pair with `tick-feeder` publishing at the market-data endpoint:
//!
//! ```text
//! engine-sim --config config/sim.toml &
//! tick-feeder --endpoint 127.0.0.1:5555 --symbol AAPL
//! ```

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use sedge_bins::common::{init_logging, shutdown_flag, wait_for_shutdown};
use sedge_core::{Clock, EngineConfig, SimulationClock, TradingEngine};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    info!(
        market_data = %config.market_data_endpoint,
        commands = %config.command_endpoint,
        telemetry = %config.telemetry_endpoint,
        "starting engine"
    );

    let clock = Arc::new(SimulationClock::new());
    let mut engine = TradingEngine::new(Arc::clone(&clock), config);
    engine.start(None)?;

    let shutdown = shutdown_flag()?;
    wait_for_shutdown(&shutdown);

    info!(sim_time_ms = clock.now_ms(), "shutdown requested");
    engine.stop();
    Ok(())
}
