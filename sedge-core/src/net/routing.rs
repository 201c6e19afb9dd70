//! Order-routing thread
//!
//! Wraps its own event loop and owns the execution engine, which is
//! constructed against the loop's bus at `start`. Orders forwarded from
//! the risk bus are pushed into this loop; the execution engine's reports
//! are published here and bridged back to the risk queue by the
//! orchestrator.

use std::sync::Arc;
use tracing::info;

use crate::bus::EventBus;
use crate::concurrent::EventQueue;
use crate::core::clock::Clock;
use crate::core::events::Event;
use crate::engine::event_loop::EventLoop;
use crate::execution::SimulatedExecutionEngine;

pub struct OrderRoutingThread {
    event_loop: EventLoop,
    clock: Arc<dyn Clock>,
    execution: Option<Arc<SimulatedExecutionEngine>>,
}

impl OrderRoutingThread {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            event_loop: EventLoop::new("order-routing"),
            clock,
            execution: None,
        }
    }

    /// Start the loop and construct the execution engine on its bus.
    /// Idempotent.
    pub fn start(&mut self) {
        if self.execution.is_some() {
            return;
        }

        self.event_loop.start();
        self.execution = Some(SimulatedExecutionEngine::new(
            Arc::clone(self.event_loop.bus()),
            Arc::clone(&self.clock),
        ));
        info!("order routing thread started (simulated execution)");
    }

    /// Tear down the execution engine, then stop the loop. Idempotent.
    pub fn stop(&mut self) {
        if self.execution.is_none() {
            return;
        }

        self.execution = None;
        self.event_loop.stop();
        info!("order routing thread stopped");
    }

    pub fn push(&self, event: Event) {
        self.event_loop.push(event);
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        self.event_loop.bus()
    }

    pub fn queue(&self) -> Arc<EventQueue<Event>> {
        self.event_loop.queue()
    }
}

impl Drop for OrderRoutingThread {
    fn drop(&mut self) {
        self.stop();
    }
}
