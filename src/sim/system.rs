use super::context::TickContext;

/// How often a simulation system should tick.
///
/// Ordered coarsest-to-finest so `systems.iter().map(|s| s.frequency()).max()`
/// yields the finest granularity needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TickFrequency {
    Daily,    // first long tick of each day
    LongTick, // every long tick
}

/// Where a system runs within one long tick. The dispatcher runs phases in
/// this order, so later phases always see what earlier ones produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TickPhase {
    /// Event eligibility, start, per-tick and end hooks.
    Events,
    /// Per-structure upkeep, efficiency, consumption and production.
    Economy,
    /// Effect-field stop/recompute/reapply for structures changed this tick.
    Effects,
    /// Titles and notifications.
    Progression,
}

/// A pluggable simulation system that runs each tick.
///
/// Object-safe so systems can be stored as `Box<dyn SimSystem>`.
pub trait SimSystem {
    fn name(&self) -> &str;
    fn frequency(&self) -> TickFrequency;
    fn phase(&self) -> TickPhase;
    fn tick(&mut self, ctx: &mut TickContext);

    /// React to signals emitted during this tick's phases.
    ///
    /// Called once per dispatch cycle with the full signal buffer in `ctx.inbox`.
    /// Signals pushed to `ctx.signals` here are **not** re-delivered (single-pass).
    /// Default: no-op.
    fn handle_signals(&mut self, ctx: &mut TickContext) {
        let _ = ctx;
    }
}
