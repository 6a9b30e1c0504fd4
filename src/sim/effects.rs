use tracing::{debug, info};

use super::context::TickContext;
use super::system::{SimSystem, TickFrequency, TickPhase};
use crate::error::CityError;
use crate::id::StructureId;
use crate::model::{
    City, Coverage, DynamicCalculation, Effect, EffectArea, EffectType, PendingEffectUpdate,
    StructureCategory,
};

/// Phase 3: apply every effect update queued by placement, moves, mods and
/// radius changes during this tick.
pub struct EffectFieldSystem;

impl SimSystem for EffectFieldSystem {
    fn name(&self) -> &str {
        "effects"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::LongTick
    }

    fn phase(&self) -> TickPhase {
        TickPhase::Effects
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        flush_pending(ctx.city);
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Queue a stop/reapply for `id`. The records to remove are remembered now,
/// so the structure may move or disappear before the flush.
pub fn invalidate(city: &mut City, id: StructureId) {
    if city.pending_effects.iter().any(|p| p.structure_id == id) {
        return;
    }
    let stale_area = city.structure(id).and_then(|s| s.registered_area);
    city.pending_effects.push(PendingEffectUpdate {
        structure_id: id,
        stale_area,
    });
}

/// Stop, recompute and reapply every queued structure. Returns how many updates ran.
pub fn flush_pending(city: &mut City) -> usize {
    let pending = std::mem::take(&mut city.pending_effects);
    let count = pending.len();
    for update in pending {
        stop(city, update.structure_id, update.stale_area);
        apply(city, update.structure_id);
    }
    count
}

fn stop(city: &mut City, id: StructureId, stale_area: Option<EffectArea>) {
    let Some(area) = stale_area else {
        return;
    };
    let cells = area.cells(city.width(), city.height());
    let removed = city.effect_grid.remove_source(&cells, id);
    debug!(structure = %id, removed, "effects stopped");
}

fn apply(city: &mut City, id: StructureId) {
    let (width, height) = (city.width(), city.height());
    let Some(structure) = city.structures.get_mut(&id) else {
        return;
    };
    structure.registered_area = None;
    let Some(area) = structure.effect_area() else {
        return;
    };
    let records: Vec<Effect> = structure
        .emitted_effects()
        .map(|spec| Effect::from_spec(id, spec))
        .collect();
    if records.is_empty() {
        return;
    }
    structure.registered_area = Some(area);

    let cells = area.cells(width, height);
    for &(x, y) in &cells {
        for record in &records {
            city.effect_grid.push(x, y, record.clone());
        }
    }
    refresh_coverage(city, id, area);
}

/// Recount the buildings and residents inside `area`. Runs only when the
/// structure's own registration changes.
fn refresh_coverage(city: &mut City, id: StructureId, area: EffectArea) {
    let grid = (city.width(), city.height());
    let mut coverage = Coverage::default();
    for other in city.placed() {
        if other.id == id {
            continue;
        }
        let Some((x, y)) = other.position else {
            continue;
        };
        if area.overlaps(x, y, other.width, other.height, grid) {
            coverage.buildings += 1;
            coverage.citizens += other.effective_residents();
        }
    }
    city.expect_structure_mut(id).coverage = coverage;
}

/// Drop every record and re-register each placed structure from scratch.
pub fn rebuild_effect_grid(city: &mut City) {
    city.effect_grid = crate::model::EffectGrid::new(city.width(), city.height());
    city.pending_effects.clear();
    for id in city.placed_ids() {
        apply(city, id);
    }
}

// ---------------------------------------------------------------------------
// Radius changes
// ---------------------------------------------------------------------------

/// Grow a structure's radius by `delta` and reapply its effects immediately.
pub fn upgrade_radius(city: &mut City, id: StructureId, delta: u32) -> Result<(), CityError> {
    let structure = city.require_mut(id)?;
    structure.radius += delta;
    let radius = structure.effective_radius();
    invalidate(city, id);
    flush_pending(city);
    debug!(structure = %id, radius, "radius upgraded");
    Ok(())
}

/// Grant `bonus` radius to every effect-emitting structure in `category`.
/// Returns how many structures were upgraded.
pub fn apply_radius_technology(city: &mut City, category: StructureCategory, bonus: u32) -> usize {
    let targets: Vec<StructureId> = city
        .structures
        .values()
        .filter(|s| s.category == category && s.emitted_effects().next().is_some())
        .map(|s| s.id)
        .collect();
    for &id in &targets {
        city.expect_structure_mut(id).radius += bonus;
        invalidate(city, id);
    }
    flush_pending(city);
    info!(%category, bonus, upgraded = targets.len(), "radius technology applied");
    targets.len()
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Live magnitude of one record. A record whose source is gone reads 0.
pub fn evaluate(city: &City, effect: &Effect) -> f64 {
    let Some(source) = city.structure(effect.source) else {
        return 0.0;
    };
    match effect.dynamic {
        DynamicCalculation::Constant => effect.magnitude,
        DynamicCalculation::EfficiencyScaled => effect.magnitude * source.last_efficiency,
        DynamicCalculation::BusinessConnectivityScaled => {
            if source.connectivity.road_ok() && !source.is_failed() {
                effect.magnitude * source.patronage_efficiency()
            } else {
                0.0
            }
        }
    }
}

/// Sum of every `effect_type` record on a tile.
pub fn effect_at(city: &City, x: u32, y: u32, effect_type: &EffectType) -> f64 {
    city.effect_grid
        .effects_of(x, y, effect_type)
        .map(|e| evaluate(city, e))
        .sum()
}

/// Average of `effect_type` over a structure's footprint, ignoring its own
/// records. Unplaced structures read 0.
pub fn structure_effect(city: &City, id: StructureId, effect_type: &EffectType) -> f64 {
    let Some(structure) = city.structure(id) else {
        return 0.0;
    };
    let Some((x0, y0)) = structure.position else {
        return 0.0;
    };
    let tiles = (structure.width * structure.height).max(1) as f64;
    let mut total = 0.0;
    for y in y0..y0 + structure.height {
        for x in x0..x0 + structure.width {
            total += city
                .effect_grid
                .effects_of(x, y, effect_type)
                .filter(|e| e.source != id)
                .map(|e| evaluate(city, e))
                .sum::<f64>();
        }
    }
    total / tiles
}

/// Mean of `structure_effect` over structures matching `filter`; 0 when none match.
pub fn average_effect(
    city: &City,
    effect_type: &EffectType,
    filter: impl Fn(&crate::model::Structure) -> bool,
) -> f64 {
    let ids: Vec<StructureId> = city.placed().filter(|s| filter(s)).map(|s| s.id).collect();
    if ids.is_empty() {
        return 0.0;
    }
    ids.iter()
        .map(|&id| structure_effect(city, id, effect_type))
        .sum::<f64>()
        / ids.len() as f64
}
