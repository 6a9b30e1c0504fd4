use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::effect::EffectArea;
use super::event::{EventKind, WorldEvent};
use super::grid::{EffectGrid, OccupancyGrid};
use super::ledger::{ResourceLedger, Trade};
use super::resource::ResourceType;
use super::structure::Structure;
use super::timestamp::SimTimestamp;
use crate::config::CityConfig;
use crate::error::CityError;
use crate::id::{IdGenerator, StructureId};

pub const MERCHANT_HUB_TITLE: &str = "Merchant Hub";
pub const METROPOLIS_TITLE: &str = "Metropolis";

/// Citywide multipliers that events and progression push on every structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityScalars {
    pub production_efficiency: f64,
    /// Share of population demand for food that was met last tick, in `[0, 1]`.
    pub food_sufficiency: f64,
    /// Bonus applied when outputs are collected by hand.
    pub receipt_bonus: f64,
    /// Per-type output multipliers; a missing entry means 1.
    pub output_multipliers: BTreeMap<ResourceType, f64>,
    /// Per-type input discounts from technology adoption; a missing entry means 0.
    pub input_discounts: BTreeMap<ResourceType, f64>,
}

impl Default for CityScalars {
    fn default() -> Self {
        Self {
            production_efficiency: 1.0,
            food_sufficiency: 1.0,
            receipt_bonus: 0.0,
            output_multipliers: BTreeMap::new(),
            input_discounts: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub time: SimTimestamp,
    pub title: String,
    pub body: String,
}

/// A structure whose registered effects must be stopped and reapplied.
///
/// `stale_area` is where the old records live. It is captured when the update
/// is queued, so records can be removed even after the structure has moved or
/// been destroyed.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEffectUpdate {
    pub structure_id: StructureId,
    pub stale_area: Option<EffectArea>,
}

/// The city aggregate: grids, ledger, structure registry, event registry, and
/// the progression sink.
#[derive(Debug, Clone)]
pub struct City {
    pub name: String,
    pub grid: OccupancyGrid,
    pub effect_grid: EffectGrid,
    pub ledger: ResourceLedger,
    pub structures: BTreeMap<StructureId, Structure>,
    pub events: Vec<WorldEvent>,
    pub scalars: CityScalars,
    pub config: CityConfig,
    /// Granted titles and the output bonus each one carries.
    pub titles: BTreeMap<String, f64>,
    pub unlocked: BTreeSet<String>,
    pub notifications: Vec<Notification>,
    pub pending_effects: Vec<PendingEffectUpdate>,
    /// Long ticks since the event engine last rolled.
    pub event_check_counter: u32,
    pub id_gen: IdGenerator,
    pub current_time: SimTimestamp,
}

impl City {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self::with_config(name, width, height, CityConfig::default())
    }

    pub fn with_config(name: &str, width: u32, height: u32, config: CityConfig) -> Self {
        Self {
            name: name.to_string(),
            grid: OccupancyGrid::new(width, height),
            effect_grid: EffectGrid::new(width, height),
            ledger: ResourceLedger::new(),
            structures: BTreeMap::new(),
            events: WorldEvent::default_catalog(),
            scalars: CityScalars::default(),
            config,
            titles: BTreeMap::new(),
            unlocked: BTreeSet::new(),
            notifications: Vec::new(),
            pending_effects: Vec::new(),
            event_check_counter: 0,
            id_gen: IdGenerator::new(),
            current_time: SimTimestamp::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.grid.width
    }

    pub fn height(&self) -> u32 {
        self.grid.height
    }

    // --- Structure registry ---

    /// Take ownership of a structure into inventory, assigning it an id.
    pub fn add_structure(&mut self, mut structure: Structure) -> StructureId {
        let id = self.id_gen.next_id();
        structure.id = id;
        structure.position = None;
        structure.built_on = None;
        structure.registered_area = None;
        self.structures.insert(id, structure);
        id
    }

    /// Copy a structure, including its mods and business state, into inventory.
    pub fn clone_structure(&mut self, id: StructureId) -> Result<StructureId, CityError> {
        let mut copy = self.require(id)?.clone();
        copy.connectivity.reset_accumulators();
        copy.coverage = Default::default();
        Ok(self.add_structure(copy))
    }

    pub fn structure(&self, id: StructureId) -> Option<&Structure> {
        self.structures.get(&id)
    }

    pub fn structure_mut(&mut self, id: StructureId) -> Option<&mut Structure> {
        self.structures.get_mut(&id)
    }

    pub fn require(&self, id: StructureId) -> Result<&Structure, CityError> {
        self.structures.get(&id).ok_or(CityError::UnknownStructure(id))
    }

    pub fn require_mut(&mut self, id: StructureId) -> Result<&mut Structure, CityError> {
        self.structures
            .get_mut(&id)
            .ok_or(CityError::UnknownStructure(id))
    }

    /// Structure lookup for callers that just resolved the id from the registry.
    ///
    /// # Panics
    /// Panics if `id` is not registered.
    pub fn expect_structure_mut(&mut self, id: StructureId) -> &mut Structure {
        self.structures
            .get_mut(&id)
            .unwrap_or_else(|| panic!("structure {id} not found"))
    }

    /// Ids of placed structures, ascending.
    pub fn placed_ids(&self) -> Vec<StructureId> {
        self.structures
            .values()
            .filter(|s| s.is_placed())
            .map(|s| s.id)
            .collect()
    }

    pub fn placed(&self) -> impl Iterator<Item = &Structure> {
        self.structures.values().filter(|s| s.is_placed())
    }

    /// Structures stacked directly on `id`.
    pub fn dependents(&self, id: StructureId) -> Vec<StructureId> {
        self.structures
            .values()
            .filter(|s| s.built_on == Some(id))
            .map(|s| s.id)
            .collect()
    }

    // --- Ledger shortcuts ---

    pub fn population(&self) -> f64 {
        self.ledger.amount(ResourceType::Population)
    }

    pub fn flunds(&self) -> f64 {
        self.ledger.amount(ResourceType::Flunds)
    }

    pub fn buy(&mut self, kind: ResourceType, quantity: f64) -> Result<Trade, CityError> {
        let curve = self.config.buy_curve;
        self.ledger.buy(kind, quantity, curve)
    }

    pub fn sell(&mut self, kind: ResourceType, quantity: f64) -> Result<Trade, CityError> {
        let curve = self.config.sell_curve;
        self.ledger.sell(kind, quantity, curve)
    }

    /// Output multiplier applied after input consumption:
    /// `(1 + title bonuses) * production_efficiency * output_multiplier(kind)`.
    pub fn bonus_multiplier(&self, kind: ResourceType) -> f64 {
        let titles: f64 = self.titles.values().sum();
        let per_type = self
            .scalars
            .output_multipliers
            .get(&kind)
            .copied()
            .unwrap_or(1.0);
        ((1.0 + titles) * self.scalars.production_efficiency * per_type).max(0.0)
    }

    /// Technology discount on consuming `kind`, in `[0, 1]`.
    pub fn input_discount(&self, kind: ResourceType) -> f64 {
        self.scalars
            .input_discounts
            .get(&kind)
            .copied()
            .unwrap_or(0.0)
            .clamp(0.0, 1.0)
    }

    // --- Event registry ---

    pub fn active_events(&self) -> Vec<&WorldEvent> {
        self.events.iter().filter(|e| e.is_active()).collect()
    }

    pub fn event(&self, kind: EventKind) -> Option<&WorldEvent> {
        self.events.iter().find(|e| e.kind == kind)
    }

    pub fn event_mut(&mut self, kind: EventKind) -> Option<&mut WorldEvent> {
        self.events.iter_mut().find(|e| e.kind == kind)
    }

    // --- Progression sink ---

    pub fn notify(&mut self, title: &str, body: &str) {
        self.notifications.push(Notification {
            time: self.current_time,
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    /// Returns true if `key` was newly unlocked.
    pub fn unlock(&mut self, key: &str) -> bool {
        let added = self.unlocked.insert(key.to_string());
        if added {
            info!(city = %self.name, key, "unlocked");
        }
        added
    }

    pub fn is_unlocked(&self, key: &str) -> bool {
        self.unlocked.contains(key)
    }

    pub fn operating_businesses(&self) -> usize {
        self.placed()
            .filter(|s| s.is_business() && !s.is_failed())
            .count()
    }

    /// Grant any titles whose thresholds are met. Titles are never revoked.
    /// Returns the newly granted titles.
    pub fn check_titles(&mut self) -> Vec<String> {
        let mut earned = Vec::new();
        if self.operating_businesses() >= self.config.commerce_title_threshold {
            earned.push(MERCHANT_HUB_TITLE);
        }
        if self.population() >= self.config.metropolis_title_threshold {
            earned.push(METROPOLIS_TITLE);
        }

        let mut granted = Vec::new();
        for title in earned {
            if self.titles.contains_key(title) {
                continue;
            }
            self.titles.insert(title.to_string(), self.config.title_bonus);
            info!(city = %self.name, title, "title granted");
            self.notify("Title earned", &format!("{} is now a {title}", self.name));
            granted.push(title.to_string());
        }
        granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::structure::{BusinessState, StructureCategory};

    fn shop() -> Structure {
        let mut s = Structure::new("shop", "Shop", StructureCategory::Commercial, 1, 1);
        s.business = Some(BusinessState::new(10.0, 5.0));
        s
    }

    #[test]
    fn add_structure_assigns_ids_in_inventory() {
        let mut city = City::new("Testville", 8, 8);
        let a = city.add_structure(shop());
        let b = city.add_structure(shop());
        assert_ne!(a, b);
        assert_eq!(city.structure(a).unwrap().id, a);
        assert!(city.placed_ids().is_empty());
        assert_eq!(
            city.require(StructureId(99)).unwrap_err(),
            CityError::UnknownStructure(StructureId(99))
        );
    }

    #[test]
    fn clone_structure_keeps_state_but_not_placement() {
        let mut city = City::new("Testville", 8, 8);
        let a = city.add_structure(shop());
        city.expect_structure_mut(a).position = Some((1, 1));
        city.expect_structure_mut(a).residents = 3.0;
        let b = city.clone_structure(a).unwrap();
        let copy = city.structure(b).unwrap();
        assert_eq!(copy.residents, 3.0);
        assert!(!copy.is_placed());
    }

    #[test]
    fn bonus_multiplier_combines_titles_and_scalars() {
        let mut city = City::new("Testville", 8, 8);
        assert_eq!(city.bonus_multiplier(ResourceType::Flunds), 1.0);
        city.titles.insert("A".to_string(), 0.25);
        city.scalars.production_efficiency = 0.8;
        city.scalars
            .output_multipliers
            .insert(ResourceType::Water, 0.5);
        assert_eq!(city.bonus_multiplier(ResourceType::Flunds), 1.0);
        assert_eq!(city.bonus_multiplier(ResourceType::Water), 0.5);
    }

    #[test]
    fn titles_granted_once() {
        let config = CityConfig {
            metropolis_title_threshold: 100.0,
            ..CityConfig::default()
        };
        let mut city = City::with_config("Testville", 8, 8, config);
        city.ledger.set_amount(ResourceType::Population, 150.0);
        assert_eq!(city.check_titles(), vec![METROPOLIS_TITLE.to_string()]);
        assert!(city.check_titles().is_empty());
        assert_eq!(city.notifications.len(), 1);
    }

    #[test]
    fn unlock_reports_first_grant_only() {
        let mut city = City::new("Testville", 4, 4);
        assert!(city.unlock("market_stall"));
        assert!(!city.unlock("market_stall"));
        assert!(city.is_unlocked("market_stall"));
    }

    #[test]
    fn new_city_carries_event_catalog() {
        let city = City::new("Testville", 4, 4);
        assert!(city.event(EventKind::Festival).is_some());
        assert!(city.active_events().is_empty());
    }
}
