use tracing::{debug, warn};

use super::effects::invalidate;
use crate::error::CityError;
use crate::id::StructureId;
use crate::model::{City, EffectSpec, ModAdjustments, ModEffect, ModKey, ResourceType};

/// Replace a structure's mod list.
///
/// The previous list is negated in full first, so applying a list and then an
/// empty list restores every field it touched: the structure's own fields,
/// storage capacity, population, and grid effects.
pub fn apply_mods(city: &mut City, id: StructureId, mods: Vec<ModEffect>) -> Result<(), CityError> {
    negate_mods(city, id)?;
    if mods.is_empty() {
        return Ok(());
    }

    let mut effects_changed = false;
    for m in &mods {
        effects_changed |= apply_one(city, id, m);
    }
    city.expect_structure_mut(id).mods = mods;
    if effects_changed {
        invalidate(city, id);
    }
    debug!(structure = %id, "mods applied");
    Ok(())
}

/// Walk back everything the current mod list changed and clear it.
pub fn negate_mods(city: &mut City, id: StructureId) -> Result<(), CityError> {
    let structure = city.require_mut(id)?;
    if structure.mods.is_empty() {
        return Ok(());
    }
    let adjustments = std::mem::take(&mut structure.mod_adjustments);
    let had_grid_effects = !structure.mod_effects.is_empty();
    structure.mod_effects.clear();
    structure.mods.clear();

    let threshold = city.config.auto_sell_threshold;
    for (kind, landed) in adjustments.landed_capacity {
        city.ledger.adjust_capacity(kind, -landed);
        city.ledger.auto_sell_excess(kind, threshold);
    }
    city.ledger
        .shift(ResourceType::Population, -adjustments.landed_residents);
    if had_grid_effects || adjustments.radius > 0 {
        invalidate(city, id);
    }
    Ok(())
}

/// Apply one mod. Returns true if the structure's grid footprint changed.
///
/// Ledger-side changes are recorded as the amounts that actually landed, so
/// negation restores the ledger exactly even when a negative mod was clamped.
fn apply_one(city: &mut City, id: StructureId, m: &ModEffect) -> bool {
    let structure = city.expect_structure_mut(id);
    let placed = structure.is_placed();

    let Some(key) = ModKey::parse(&m.effect_type) else {
        if m.effect_type.is_custom() {
            warn!(structure = %id, key = %m.effect_type, "unknown mod key ignored");
            return false;
        }
        structure
            .mod_effects
            .push(EffectSpec::constant(m.effect_type.clone(), m.magnitude));
        return true;
    };

    let adj: &mut ModAdjustments = &mut structure.mod_adjustments;
    match key {
        ModKey::Storage => {
            adj.store_amount += m.magnitude;
            if placed {
                let stores = structure.stores.clone();
                for kind in stores {
                    let landed = city.ledger.adjust_capacity(kind, m.magnitude);
                    *city
                        .expect_structure_mut(id)
                        .mod_adjustments
                        .landed_capacity
                        .entry(kind)
                        .or_insert(0.0) += landed;
                }
            }
            false
        }
        ModKey::Population => {
            adj.residents += m.magnitude;
            if placed {
                let landed = city.ledger.shift(ResourceType::Population, m.magnitude);
                city.expect_structure_mut(id).mod_adjustments.landed_residents += landed;
            }
            false
        }
        ModKey::Research => {
            adj.research_rate += m.magnitude;
            false
        }
        ModKey::Upkeep => {
            adj.upkeep_reduction += m.magnitude;
            false
        }
        ModKey::PatronCap => {
            adj.patron_cap += m.magnitude;
            false
        }
        ModKey::Radius => {
            adj.radius += m.magnitude.max(0.0).round() as u32;
            true
        }
    }
}
