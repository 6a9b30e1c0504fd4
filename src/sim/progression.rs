use tracing::debug;

use super::context::TickContext;
use super::signal::SignalKind;
use super::system::{SimSystem, TickFrequency, TickPhase};

/// Phase 4: title checks, plus player notifications for what the earlier
/// phases reported.
pub struct ProgressionSystem;

impl SimSystem for ProgressionSystem {
    fn name(&self) -> &str {
        "progression"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::LongTick
    }

    fn phase(&self) -> TickPhase {
        TickPhase::Progression
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        let granted = ctx.city.check_titles();
        if !granted.is_empty() {
            debug!(?granted, "titles granted");
        }
    }

    fn handle_signals(&mut self, ctx: &mut TickContext) {
        let mut damaged = 0;
        for signal in ctx.inbox {
            match &signal.kind {
                SignalKind::BusinessFailed { structure_id } => {
                    let name = ctx
                        .city
                        .structure(*structure_id)
                        .map_or_else(|| structure_id.to_string(), |s| s.name.clone());
                    ctx.city.notify(
                        "Business closed",
                        &format!("{name} has closed for lack of customers"),
                    );
                }
                SignalKind::StructureDamaged { .. } => damaged += 1,
                _ => {}
            }
        }
        if damaged > 0 {
            ctx.city
                .notify("Damage report", &format!("{damaged} structures need repair"));
        }
    }
}
