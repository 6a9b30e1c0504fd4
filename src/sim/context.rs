use rand::RngCore;

use super::signal::Signal;
use crate::model::{Capabilities, City};

/// Context passed to each system on every tick.
pub struct TickContext<'a> {
    pub city: &'a mut City,
    pub rng: &'a mut dyn RngCore,
    /// Mechanics switched on for this run. Systems read gates from here, never
    /// from global state.
    pub capabilities: Capabilities,
    /// Systems push signals here during tick/handle_signals.
    pub signals: &'a mut Vec<Signal>,
    /// Signals emitted by every system during this tick's phases (read-only).
    pub inbox: &'a [Signal],
}
