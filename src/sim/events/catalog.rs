use rand::{Rng, RngCore};

use crate::id::StructureId;
use crate::model::{Capabilities, City, EffectType, EventKind, ResourceType, Structure};
use crate::sim::effects::{average_effect, structure_effect};
use crate::sim::placement::place_structure;
use crate::sim::signal::SignalKind;
use crate::templates;

pub const MARKET_STALL_UNLOCK: &str = "market_stall";

const BURGLARY_MIN_POPULATION: f64 = 200.0;
const BURGLARY_MIN_FLUNDS: f64 = 500.0;
const EARTHQUAKE_MIN_POPULATION: f64 = 1000.0;
const FESTIVAL_MIN_POPULATION: f64 = 100.0;
const EPIDEMIC_MIN_POPULATION: f64 = 500.0;

/// Earthquake odds climb from 0 to the base chance over this many skipped ticks.
const EARTHQUAKE_RAMP_TICKS: f64 = 400.0;

fn base_chance(kind: EventKind) -> f64 {
    match kind {
        EventKind::Burglary => 0.05,
        EventKind::Earthquake => 0.01,
        EventKind::Fire => 0.04,
        EventKind::MerchantArrival => 0.03,
        EventKind::Festival => 0.03,
        EventKind::ResearchSurge => 0.02,
        EventKind::MarketBoom => 0.02,
        EventKind::Drought => 0.02,
        EventKind::Epidemic => 0.03,
    }
}

// ---------------------------------------------------------------------------
// Eligibility
// ---------------------------------------------------------------------------

/// Chance this event starts on a roll, given current city state. 0 when a
/// precondition fails. Reads only.
pub fn activation_chance(city: &City, kind: EventKind, skipped: u32, capabilities: Capabilities) -> f64 {
    let population = city.population();
    let base = base_chance(kind);
    match kind {
        EventKind::Burglary => {
            if population >= BURGLARY_MIN_POPULATION && city.flunds() >= BURGLARY_MIN_FLUNDS {
                base
            } else {
                0.0
            }
        }
        EventKind::Earthquake => {
            if population < EARTHQUAKE_MIN_POPULATION {
                return 0.0;
            }
            base * (skipped as f64 / EARTHQUAKE_RAMP_TICKS).min(1.0)
        }
        EventKind::Fire => {
            if capabilities.contains(Capabilities::FIRE_RISK) && city.placed().any(|s| s.flammable) {
                base
            } else {
                0.0
            }
        }
        EventKind::MerchantArrival => {
            if !city.is_unlocked(MARKET_STALL_UNLOCK) && !city.grid.free_tiles().is_empty() {
                base
            } else {
                0.0
            }
        }
        EventKind::Festival => {
            if population >= FESTIVAL_MIN_POPULATION {
                base
            } else {
                0.0
            }
        }
        EventKind::ResearchSurge => {
            if city.placed().any(|s| s.produces(ResourceType::Research)) {
                base
            } else {
                0.0
            }
        }
        EventKind::MarketBoom => base,
        EventKind::Drought => {
            if capabilities.contains(Capabilities::WATER_SCARCITY) {
                base
            } else {
                0.0
            }
        }
        EventKind::Epidemic => {
            if !capabilities.contains(Capabilities::HEALTH) || population < EPIDEMIC_MIN_POPULATION {
                return 0.0;
            }
            let care = average_effect(city, &EffectType::Healthcare, |s| s.effective_residents() > 0.0);
            base * (1.0 - care.clamp(0.0, 1.0))
        }
    }
}

/// Preconditions plus one random draw.
pub fn is_eligible(
    city: &City,
    kind: EventKind,
    skipped: u32,
    capabilities: Capabilities,
    rng: &mut dyn RngCore,
) -> bool {
    let chance = activation_chance(city, kind, skipped, capabilities);
    chance > 0.0 && rng.random_range(0.0..1.0) < chance
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Immediate effects of an event starting. Constant modifiers stash the value
/// they replace in the event's `saved_value`.
pub fn on_start(
    city: &mut City,
    index: usize,
    capabilities: Capabilities,
    rng: &mut dyn RngCore,
) -> Vec<SignalKind> {
    let event = &city.events[index];
    let (kind, p0, p1) = (event.kind, event.param(0), event.param(1));
    match kind {
        EventKind::Burglary => {
            let police = average_effect(city, &EffectType::Police, |_| true).clamp(0.0, 1.0);
            let loss = city.flunds() * p0 * (1.0 - police);
            city.ledger.consume(ResourceType::Flunds, loss);
            Vec::new()
        }
        EventKind::Earthquake => {
            let x = rng.random_range(0..city.width().max(1));
            let y = rng.random_range(0..city.height().max(1));
            let epicentre = (x as f64 + 0.5, y as f64 + 0.5);
            apply_falloff_damage(city, epicentre, p1, p0, |_| true)
        }
        EventKind::Fire => {
            let candidates: Vec<StructureId> =
                city.placed().filter(|s| s.flammable).map(|s| s.id).collect();
            if candidates.is_empty() {
                return Vec::new();
            }
            let origin = candidates[rng.random_range(0..candidates.len())];
            let protection =
                structure_effect(city, origin, &EffectType::FireProtection).clamp(0.0, 1.0);
            let Some(centre) = city.structure(origin).and_then(Structure::center) else {
                return Vec::new();
            };
            apply_falloff_damage(city, centre, p1, p0 * (1.0 - protection), |s| s.flammable)
        }
        EventKind::MerchantArrival => {
            let (x, y) = select_spawn_site(city, rng);
            let id = city.add_structure(templates::market_stall());
            place_structure(city, id, x as i64, y as i64, capabilities)
                .unwrap_or_else(|e| panic!("merchant stall at free tile ({x}, {y}): {e}"));
            city.unlock(MARKET_STALL_UNLOCK);
            vec![SignalKind::StructureSpawned { structure_id: id }]
        }
        EventKind::Festival | EventKind::ResearchSurge => Vec::new(),
        EventKind::MarketBoom => {
            let saved = city.ledger.sell_multiplier;
            city.ledger.sell_multiplier = saved * p0;
            city.events[index].saved_value = Some(saved);
            Vec::new()
        }
        EventKind::Drought => {
            let multiplier = city
                .scalars
                .output_multipliers
                .entry(ResourceType::Water)
                .or_insert(1.0);
            let saved = *multiplier;
            *multiplier = saved * p0;
            city.events[index].saved_value = Some(saved);
            Vec::new()
        }
        EventKind::Epidemic => {
            let saved = city.scalars.production_efficiency;
            city.scalars.production_efficiency = saved * p0;
            city.events[index].saved_value = Some(saved);
            Vec::new()
        }
    }
}

/// Per-tick hook of an active event, run before its duration is decremented.
/// Returns the reward paid, if any.
pub fn on_tick(city: &mut City, index: usize) -> f64 {
    let event = &city.events[index];
    let reward = event.decayed(event.param(0));
    match event.kind {
        EventKind::Festival => city.ledger.produce(ResourceType::Flunds, reward),
        EventKind::ResearchSurge => city.ledger.produce(ResourceType::Research, reward),
        _ => 0.0,
    }
}

/// Reverse whatever `on_start` left in place. Runs once per activation.
pub fn on_end(city: &mut City, index: usize) {
    let Some(saved) = city.events[index].saved_value.take() else {
        return;
    };
    match city.events[index].kind {
        EventKind::MarketBoom => city.ledger.sell_multiplier = saved,
        EventKind::Drought => {
            city.scalars
                .output_multipliers
                .insert(ResourceType::Water, saved);
        }
        EventKind::Epidemic => city.scalars.production_efficiency = saved,
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Damage every placed structure matching `filter` within `radius` of `centre`,
/// by `strength` at the centre falling linearly to 0 at the radius.
pub fn apply_falloff_damage(
    city: &mut City,
    centre: (f64, f64),
    radius: f64,
    strength: f64,
    filter: impl Fn(&Structure) -> bool,
) -> Vec<SignalKind> {
    if !(radius > 0.0) || !(strength > 0.0) {
        return Vec::new();
    }
    let hits: Vec<(StructureId, f64)> = city
        .placed()
        .filter(|s| filter(s))
        .filter_map(|s| {
            let (x, y) = s.center()?;
            let distance = ((x - centre.0).powi(2) + (y - centre.1).powi(2)).sqrt();
            (distance < radius).then(|| (s.id, strength * (1.0 - distance / radius)))
        })
        .collect();

    let mut signals = Vec::new();
    for (id, damage) in hits {
        let structure = city.expect_structure_mut(id);
        let before = structure.damaged_efficiency;
        structure.damaged_efficiency = (before - damage).clamp(0.0, 1.0);
        let amount = before - structure.damaged_efficiency;
        if amount > 0.0 {
            signals.push(SignalKind::StructureDamaged {
                structure_id: id,
                amount,
            });
        }
    }
    signals
}

/// Pick a random free 1x1 tile for a spawned structure.
///
/// # Panics
/// Panics if the grid has no free tile. Eligibility checks for one first, so
/// reaching this with a full grid means that check was skipped.
pub fn select_spawn_site(city: &City, rng: &mut dyn RngCore) -> (u32, u32) {
    let free = city.grid.free_tiles();
    assert!(
        !free.is_empty(),
        "select_spawn_site: no free tile in {}",
        city.name
    );
    free[rng.random_range(0..free.len())]
}
