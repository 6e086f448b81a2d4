use std::sync::Arc;

use crate::{platform::TimeoutGuard, utils::rangefinder_error::RangefinderError};

use super::{Edge, EchoHandler};

/// Glue between the echo pin interrupt, the handler and the timeout guard. Owned by the
/// interrupt callback: each edge is forwarded to the handler and a rising edge that opened an
/// echo arms the guard for that cycle.
pub struct EchoChannel<H: EchoHandler, G: TimeoutGuard> {
    handler: Arc<H>,
    guard: G,
    timeout_us: u64,
}

impl<H: EchoHandler, G: TimeoutGuard> EchoChannel<H, G> {
    pub fn new(handler: Arc<H>, guard: G, timeout_us: u64) -> Self {
        EchoChannel { handler, guard, timeout_us }
    }

    /// Handles one edge seen at `now_us`.
    ///
    /// # Errors
    ///
    /// Returns the guard error if the timeout could not be armed. The edge itself is always
    /// recorded.
    pub fn on_edge(&mut self, edge: Edge, now_us: u64) -> Result<(), RangefinderError> {
        match edge {
            Edge::Rising => match self.handler.on_rising_edge(now_us) {
                Some(cycle) => self.guard.arm(cycle, self.timeout_us),
                None => Ok(()),
            },
            Edge::Falling => {
                self.handler.on_falling_edge(now_us);
                Ok(())
            }
        }
    }
}
