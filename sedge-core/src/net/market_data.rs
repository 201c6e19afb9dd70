//! Market-data ingress thread
//!
//! Owns a [`MarketDataGateway`] and the thread that runs its receive
//! loop. Construction stores the parameters; the socket is opened and the
//! thread spawned in `start`, so an engine built for manual event
//! injection never touches the network.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::info;

use crate::core::clock::SimulationClock;
use crate::net::gateway::{EventSink, MarketDataGateway};

pub struct MarketDataThread {
    clock: Arc<SimulationClock>,
    sink: EventSink,
    endpoint: String,
    gateway: Option<Arc<MarketDataGateway>>,
    worker: Option<JoinHandle<()>>,
}

impl MarketDataThread {
    pub fn new(clock: Arc<SimulationClock>, sink: EventSink, endpoint: impl Into<String>) -> Self {
        Self {
            clock,
            sink,
            endpoint: endpoint.into(),
            gateway: None,
            worker: None,
        }
    }

    /// Open the socket and spawn the receive thread. Idempotent.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        let gateway = Arc::new(MarketDataGateway::bind(
            Arc::clone(&self.clock),
            Arc::clone(&self.sink),
            &self.endpoint,
        )?);

        let endpoint = self.endpoint.clone();
        let runner = Arc::clone(&gateway);
        let handle = std::thread::Builder::new()
            .name("market-data".to_string())
            .spawn(move || {
                info!(%endpoint, "market data thread listening");
                runner.run();
                info!("market data receive loop exited");
            })
            .context("spawning market data thread")?;

        self.gateway = Some(gateway);
        self.worker = Some(handle);
        Ok(())
    }

    /// Stop the gateway and join the thread. Idempotent.
    pub fn stop(&mut self) {
        if let Some(gateway) = &self.gateway {
            gateway.stop();
        }
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
        self.gateway = None;
    }
}

impl Drop for MarketDataThread {
    fn drop(&mut self) {
        self.stop();
    }
}
