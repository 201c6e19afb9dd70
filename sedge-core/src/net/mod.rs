//! Network edges of the engine: the market-data gateway and its owning
//! thread, the order-routing thread, and the IPC server.
//!
//! The transport is UDP datagrams carrying one UTF-8 JSON record each,
//! which keeps the "one record per transport message, no framing" wire
//! contract trivially true in both directions.

pub mod gateway;
pub mod ipc;
pub mod market_data;
pub mod routing;

pub use gateway::{EventSink, MarketDataGateway};
pub use ipc::{format_telemetry, CommandHandler, IpcServer};
pub use market_data::MarketDataThread;
pub use routing::OrderRoutingThread;
