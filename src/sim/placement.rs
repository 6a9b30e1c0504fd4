use std::collections::BTreeMap;

use tracing::{debug, info};

use super::economy::preview_efficiency;
use super::effects::invalidate;
use crate::error::CityError;
use crate::id::StructureId;
use crate::model::{Capabilities, City, ResourceType, Structure};

/// Put an inventoried structure on the map.
///
/// Registers storage capacity and residents, seeds the connectivity baseline so
/// the structure is not penalised for ticks it was not placed for, queues its
/// effects, and evaluates its efficiency immediately under `capabilities`. A
/// structure already on the map is moved instead.
pub fn place_structure(
    city: &mut City,
    id: StructureId,
    x: i64,
    y: i64,
    capabilities: Capabilities,
) -> Result<(), CityError> {
    if city.require(id)?.is_placed() {
        return move_structure(city, id, x, y);
    }
    let host = check_site(city, id, x, y)?;
    let (x, y) = (x as u32, y as u32);

    let structure = city.expect_structure_mut(id);
    structure.position = Some((x, y));
    structure.built_on = host;
    structure.connectivity.seed_baseline(1);
    let (width, height) = (structure.width, structure.height);
    let stores = structure.stores.clone();
    let (store_amount, mod_store_amount) = (structure.store_amount, structure.mod_adjustments.store_amount);
    let (residents, mod_residents) = (structure.residents, structure.mod_adjustments.residents);

    city.grid.fill(x, y, width, height, Some(id));
    let mut landed_capacity = BTreeMap::new();
    for kind in stores {
        city.ledger.adjust_capacity(kind, store_amount);
        if mod_store_amount != 0.0 {
            landed_capacity.insert(kind, city.ledger.adjust_capacity(kind, mod_store_amount));
        }
    }
    city.ledger.shift(ResourceType::Population, residents);
    let landed_residents = city.ledger.shift(ResourceType::Population, mod_residents);
    let adjustments = &mut city.expect_structure_mut(id).mod_adjustments;
    adjustments.landed_capacity = landed_capacity;
    adjustments.landed_residents = landed_residents;
    invalidate(city, id);

    let efficiency = preview_efficiency(city, id, capabilities);
    city.expect_structure_mut(id).last_efficiency = efficiency;
    debug!(structure = %id, x, y, ?host, efficiency, "structure placed");
    Ok(())
}

/// Take a structure off the map and back into inventory.
///
/// Storage capacity drops by exactly what the structure contributed; stock left
/// above `capacity * auto_sell_threshold` is sold. Its effects stay on the grid
/// until the next effect flush.
pub fn remove_structure(city: &mut City, id: StructureId) -> Result<(), CityError> {
    let structure = city.require(id)?;
    let Some((x, y)) = structure.position else {
        return Err(CityError::NotPlaced(id));
    };
    if !city.dependents(id).is_empty() {
        return Err(CityError::HasDependents(id));
    }
    let (width, height, host) = (structure.width, structure.height, structure.built_on);
    let stores = structure.stores.clone();
    let store_amount = structure.store_amount;
    let residents = structure.residents + structure.mod_adjustments.landed_residents;
    let landed_capacity = structure.mod_adjustments.landed_capacity.clone();

    invalidate(city, id);
    city.grid.fill(x, y, width, height, host);

    let threshold = city.config.auto_sell_threshold;
    for kind in stores {
        let landed = landed_capacity.get(&kind).copied().unwrap_or(0.0);
        city.ledger.adjust_capacity(kind, -(store_amount + landed));
        let revenue = city.ledger.auto_sell_excess(kind, threshold);
        if revenue > 0.0 {
            info!(structure = %id, resource = %kind, revenue, "excess stock sold on removal");
        }
    }
    city.ledger.shift(ResourceType::Population, -residents);

    let structure = city.expect_structure_mut(id);
    structure.position = None;
    structure.built_on = None;
    structure.mod_adjustments.landed_capacity.clear();
    structure.mod_adjustments.landed_residents = 0.0;
    debug!(structure = %id, "structure removed");
    Ok(())
}

/// Relocate a placed structure, keeping its accumulated state and its storage
/// and resident contributions.
pub fn move_structure(city: &mut City, id: StructureId, x: i64, y: i64) -> Result<(), CityError> {
    let structure = city.require(id)?;
    let Some((old_x, old_y)) = structure.position else {
        return Err(CityError::NotPlaced(id));
    };
    if !city.dependents(id).is_empty() {
        return Err(CityError::HasDependents(id));
    }
    let (width, height, old_host) = (structure.width, structure.height, structure.built_on);

    city.grid.fill(old_x, old_y, width, height, old_host);
    let host = match check_site(city, id, x, y) {
        Ok(host) => host,
        Err(err) => {
            city.grid.fill(old_x, old_y, width, height, Some(id));
            return Err(err);
        }
    };
    let (x, y) = (x as u32, y as u32);

    invalidate(city, id);
    city.grid.fill(x, y, width, height, Some(id));
    let structure = city.expect_structure_mut(id);
    structure.position = Some((x, y));
    structure.built_on = host;
    debug!(structure = %id, x, y, "structure moved");
    Ok(())
}

/// Remove a structure from the map (if placed) and from the registry.
pub fn destroy_structure(city: &mut City, id: StructureId) -> Result<Structure, CityError> {
    if city.require(id)?.is_placed() {
        remove_structure(city, id)?;
    }
    city.structures
        .remove(&id)
        .ok_or(CityError::UnknownStructure(id))
}

/// Validate a footprint at `(x, y)` for `id`. Returns the host to stack onto,
/// if the site is exactly one stack-supporting structure.
fn check_site(city: &City, id: StructureId, x: i64, y: i64) -> Result<Option<StructureId>, CityError> {
    let structure = city.require(id)?;
    let (width, height) = (structure.width, structure.height);
    if !city.grid.in_bounds(x, y, width, height) {
        return Err(CityError::OutOfBounds {
            x,
            y,
            width,
            height,
        });
    }
    let (x, y) = (x as u32, y as u32);

    let occupants = city.grid.occupants(x, y, width, height);
    if occupants.iter().all(Option::is_none) {
        return Ok(None);
    }
    if let &[Some(host)] = occupants.as_slice() {
        let supports = city.structure(host).is_some_and(|h| h.supports_stacking);
        if structure.stackable && supports && host != id {
            return Ok(Some(host));
        }
    }

    let (tx, ty) = (y..y + height)
        .flat_map(|ty| (x..x + width).map(move |tx| (tx, ty)))
        .find(|&(tx, ty)| city.grid.at(tx, ty).is_some())
        .unwrap_or((x, y));
    Err(CityError::Occupied { x: tx, y: ty })
}
