//! Serializable save format for a `City`.
//!
//! The occupancy and effect grids are derived state and are not saved: the
//! restore rebuilds occupancy from structure positions and re-registers every
//! placed structure's effects.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::CityConfig;
use crate::error::CityError;
use crate::id::IdGenerator;
use crate::model::{
    City, CityScalars, Notification, ResourceLedger, SimTimestamp, Structure, WorldEvent,
};
use crate::sim::effects::rebuild_effect_grid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySnapshot {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub config: CityConfig,
    pub ledger: ResourceLedger,
    pub structures: Vec<Structure>,
    pub events: Vec<WorldEvent>,
    pub scalars: CityScalars,
    pub titles: BTreeMap<String, f64>,
    pub unlocked: BTreeSet<String>,
    pub notifications: Vec<Notification>,
    pub event_check_counter: u32,
    pub next_id: u64,
    pub current_time: SimTimestamp,
}

impl City {
    pub fn snapshot(&self) -> CitySnapshot {
        CitySnapshot {
            name: self.name.clone(),
            width: self.width(),
            height: self.height(),
            config: self.config.clone(),
            ledger: self.ledger.clone(),
            structures: self.structures.values().cloned().collect(),
            events: self.events.clone(),
            scalars: self.scalars.clone(),
            titles: self.titles.clone(),
            unlocked: self.unlocked.clone(),
            notifications: self.notifications.clone(),
            event_check_counter: self.event_check_counter,
            next_id: self.id_gen.peek(),
            current_time: self.current_time,
        }
    }

    /// Rebuild a city from a snapshot.
    ///
    /// Hosts are laid down before the structures stacked on them. Queued effect
    /// updates are not saved; every placed structure is registered afresh, and
    /// the saved coverage counts are kept.
    pub fn from_snapshot(snapshot: CitySnapshot) -> Result<City, CityError> {
        let mut city = City::with_config(
            &snapshot.name,
            snapshot.width,
            snapshot.height,
            snapshot.config,
        );
        city.ledger = snapshot.ledger;
        city.events = snapshot.events;
        city.scalars = snapshot.scalars;
        city.titles = snapshot.titles;
        city.unlocked = snapshot.unlocked;
        city.notifications = snapshot.notifications;
        city.event_check_counter = snapshot.event_check_counter;
        city.id_gen = IdGenerator::starting_from(snapshot.next_id);
        city.current_time = snapshot.current_time;

        let (hosts, stacked): (Vec<&Structure>, Vec<&Structure>) = snapshot
            .structures
            .iter()
            .filter(|s| s.is_placed())
            .partition(|s| s.built_on.is_none());
        for structure in hosts.into_iter().chain(stacked) {
            lay_down(&mut city, structure)?;
        }

        city.structures = snapshot
            .structures
            .iter()
            .map(|s| (s.id, s.clone()))
            .collect();
        rebuild_effect_grid(&mut city);
        for saved in &snapshot.structures {
            city.expect_structure_mut(saved.id).coverage = saved.coverage.clone();
        }
        info!(
            city = %city.name,
            structures = city.structures.len(),
            effects = city.effect_grid.total_records(),
            "city restored"
        );
        Ok(city)
    }
}

fn lay_down(city: &mut City, structure: &Structure) -> Result<(), CityError> {
    let Some((x, y)) = structure.position else {
        return Ok(());
    };
    let (width, height) = (structure.width, structure.height);
    if !city.grid.in_bounds(x as i64, y as i64, width, height) {
        return Err(CityError::OutOfBounds {
            x: x as i64,
            y: y as i64,
            width,
            height,
        });
    }
    let expected = structure.built_on;
    for ty in y..y + height {
        for tx in x..x + width {
            if city.grid.at(tx, ty) != expected {
                return Err(CityError::Occupied { x: tx, y: ty });
            }
        }
    }
    city.grid.fill(x, y, width, height, Some(structure.id));
    Ok(())
}
