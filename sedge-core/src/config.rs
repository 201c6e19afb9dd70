//! Engine configuration
//!
//! Construction-time parameters: the three transport endpoints, the risk
//! limits, and strategy parameters. An empty endpoint string disables the
//! corresponding thread, which is how tests and embedded backtests run the
//! engine without touching the network.
//!
//! [`EngineConfig::load`] layers defaults, a TOML file, and
//! `SEDGE__`-prefixed environment overrides.

use anyhow::{bail, Context, Result};
use config::{Config as ConfigLoader, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::types::RiskLimits;

pub const DEFAULT_MARKET_DATA_ENDPOINT: &str = "127.0.0.1:5555";
pub const DEFAULT_COMMAND_ENDPOINT: &str = "127.0.0.1:5556";
pub const DEFAULT_TELEMETRY_ENDPOINT: &str = "127.0.0.1:5557";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Where the market-data gateway receives tick datagrams.
    #[serde(default = "default_market_data_endpoint")]
    pub market_data_endpoint: String,

    /// Where the IPC server answers PING / STATUS / HALT.
    #[serde(default = "default_command_endpoint")]
    pub command_endpoint: String,

    /// Where telemetry records are published.
    #[serde(default = "default_telemetry_endpoint")]
    pub telemetry_endpoint: String,

    #[serde(default)]
    pub risk: RiskLimits,

    #[serde(default)]
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_strategy_id")]
    pub strategy_id: String,

    /// Ticks priced above this emit a Buy signal.
    #[serde(default)]
    pub price_threshold: f64,
}

fn default_market_data_endpoint() -> String {
    DEFAULT_MARKET_DATA_ENDPOINT.to_string()
}

fn default_command_endpoint() -> String {
    DEFAULT_COMMAND_ENDPOINT.to_string()
}

fn default_telemetry_endpoint() -> String {
    DEFAULT_TELEMETRY_ENDPOINT.to_string()
}

fn default_strategy_id() -> String {
    "threshold".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            market_data_endpoint: default_market_data_endpoint(),
            command_endpoint: default_command_endpoint(),
            telemetry_endpoint: default_telemetry_endpoint(),
            risk: RiskLimits::default(),
            strategy: StrategyConfig::default(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            strategy_id: default_strategy_id(),
            price_threshold: 0.0,
        }
    }
}

impl EngineConfig {
    /// All endpoints disabled: no sockets, no network threads. The engine
    /// is driven entirely through `push_event`.
    pub fn isolated() -> Self {
        Self {
            market_data_endpoint: String::new(),
            command_endpoint: String::new(),
            telemetry_endpoint: String::new(),
            ..Self::default()
        }
    }

    /// Load from a TOML file with `SEDGE`-prefixed environment variable
    /// overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let loaded = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("SEDGE").separator("__"))
            .build()
            .context("failed to build configuration")?;

        let cfg: Self = loaded
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.risk.max_position_per_symbol <= 0.0 {
            bail!(
                "risk.max_position_per_symbol must be positive, got {}",
                self.risk.max_position_per_symbol
            );
        }
        if self.risk.max_drawdown >= 0.0 {
            bail!(
                "risk.max_drawdown must be strictly negative, got {}",
                self.risk.max_drawdown
            );
        }
        Ok(())
    }
}
