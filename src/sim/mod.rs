pub mod business;
mod context;
pub mod economy;
pub mod effects;
pub mod events;
pub mod mods;
pub mod placement;
mod progression;
mod runner;
mod signal;
mod system;

pub use business::{BusinessTransition, record_patronage, reopen_business};
pub use context::TickContext;
pub use economy::{
    EconomySystem, EfficiencyFactors, collect_outputs, compute_efficiency, power_on_mid_tick,
    repair_structure,
};
pub use effects::{
    EffectFieldSystem, apply_radius_technology, effect_at, flush_pending, structure_effect,
    upgrade_radius,
};
pub use events::EventSystem;
pub use mods::{apply_mods, negate_mods};
pub use placement::{destroy_structure, move_structure, place_structure, remove_structure};
pub use progression::ProgressionSystem;
pub use runner::{SimConfig, accrue_short_ticks, dispatch_systems, run, should_fire};
pub use signal::{Signal, SignalKind};
pub use system::{SimSystem, TickFrequency, TickPhase};

/// The four systems in phase order: events, economy, effects, progression.
pub fn default_systems() -> Vec<Box<dyn SimSystem>> {
    vec![
        Box::new(EventSystem),
        Box::new(EconomySystem),
        Box::new(EffectFieldSystem),
        Box::new(ProgressionSystem),
    ]
}
