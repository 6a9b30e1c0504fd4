use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::effect::{EffectArea, EffectSpec, EffectType};
use super::resource::{Resource, ResourceType};
use crate::id::StructureId;

/// Patronage below this share of capacity counts toward business failure.
pub const LOW_PATRONAGE_SHARE: f64 = 0.1;
/// Consecutive low-patronage ticks after which a business fails.
pub const FAILURE_TICKS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum StructureCategory {
    Residential,
    Commercial,
    Restaurant,
    Industrial,
    Energy,
    Service,
    Storage,
    Civic,
}

string_enum!(StructureCategory {
    Residential => "residential",
    Commercial => "commercial",
    Restaurant => "restaurant",
    Industrial => "industrial",
    Energy => "energy",
    Service => "service",
    Storage => "storage",
    Civic => "civic",
});

impl StructureCategory {
    /// Businesses whose revenue depends on citizens being fed.
    pub fn is_revenue_business(self) -> bool {
        matches!(self, StructureCategory::Commercial | StructureCategory::Restaurant)
    }
}

/// Infrastructure needs, current connection state, and the short-tick
/// accumulators that turn connection state into time fractions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Connectivity {
    pub needs_power: bool,
    pub needs_water: bool,
    pub needs_road: bool,
    pub powered: bool,
    pub watered: bool,
    pub road_connected: bool,
    pub sampled_ticks: u32,
    pub powered_ticks: u32,
    pub watered_ticks: u32,
}

impl Connectivity {
    fn has_power(&self) -> bool {
        !self.needs_power || self.powered
    }

    fn has_water(&self) -> bool {
        !self.needs_water || self.watered
    }

    /// Record one short tick of the current connection state.
    pub fn sample(&mut self) {
        self.sampled_ticks += 1;
        if self.has_power() {
            self.powered_ticks += 1;
        }
        if self.has_water() {
            self.watered_ticks += 1;
        }
    }

    /// Fill the accumulators as if the current state had held for a whole window.
    pub fn seed_baseline(&mut self, window: u32) {
        let window = window.max(1);
        self.sampled_ticks = window;
        self.powered_ticks = if self.has_power() { window } else { 0 };
        self.watered_ticks = if self.has_water() { window } else { 0 };
    }

    pub fn reset_accumulators(&mut self) {
        self.sampled_ticks = 0;
        self.powered_ticks = 0;
        self.watered_ticks = 0;
    }

    pub fn powered_fraction(&self) -> f64 {
        if !self.needs_power {
            return 1.0;
        }
        fraction(self.powered_ticks, self.sampled_ticks, self.powered)
    }

    pub fn watered_fraction(&self) -> f64 {
        if !self.needs_water {
            return 1.0;
        }
        fraction(self.watered_ticks, self.sampled_ticks, self.watered)
    }

    pub fn road_ok(&self) -> bool {
        !self.needs_road || self.road_connected
    }
}

fn fraction(hits: u32, samples: u32, current: bool) -> f64 {
    if samples == 0 {
        return if current { 1.0 } else { 0.0 };
    }
    (hits as f64 / samples as f64).min(1.0)
}

/// Patronage and failure tracking for a business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessState {
    pub patron_cap: f64,
    pub patrons: f64,
    pub business_value: f64,
    pub failure_counter: u32,
    pub failed: bool,
    pub patronage_efficiency: f64,
}

impl BusinessState {
    pub fn new(patron_cap: f64, business_value: f64) -> Self {
        Self {
            patron_cap,
            patrons: 0.0,
            business_value,
            failure_counter: 0,
            failed: false,
            patronage_efficiency: 1.0,
        }
    }
}

/// Cached count of what a service's effect area covers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Coverage {
    pub buildings: u32,
    pub citizens: f64,
}

/// A reversible delta from the reward mechanism.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModEffect {
    pub effect_type: EffectType,
    pub magnitude: f64,
}

impl ModEffect {
    pub fn new(effect_type: EffectType, magnitude: f64) -> Self {
        Self {
            effect_type,
            magnitude,
        }
    }
}

/// What the current mod list has changed on the structure's own fields.
/// Negation walks these back, then zeroes them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModAdjustments {
    pub store_amount: f64,
    pub residents: f64,
    pub research_rate: f64,
    pub upkeep_reduction: f64,
    pub patron_cap: f64,
    pub radius: u32,
    /// Ledger capacity the mods actually added per stored type while placed,
    /// after clamping at zero.
    #[serde(default)]
    pub landed_capacity: BTreeMap<ResourceType, f64>,
    /// Population the mods actually added while placed.
    #[serde(default)]
    pub landed_residents: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: StructureId,
    /// Template key this structure was instantiated from.
    pub template: String,
    pub name: String,
    pub category: StructureCategory,

    pub width: u32,
    pub height: u32,
    /// Top-left tile when placed; `None` while in inventory.
    pub position: Option<(u32, u32)>,
    /// May be placed on top of a structure that `supports_stacking`.
    pub stackable: bool,
    pub supports_stacking: bool,
    pub built_on: Option<StructureId>,

    pub connectivity: Connectivity,
    pub last_efficiency: f64,
    pub upkeep_efficiency: f64,
    pub damaged_efficiency: f64,
    pub repair_cost: f64,
    pub flammable: bool,

    pub inputs: Vec<Resource>,
    pub outputs: Vec<Resource>,
    pub upkeep: Vec<(ResourceType, f64)>,
    pub upkeep_scales_with_coverage: bool,
    pub coverage: Coverage,

    pub business: Option<BusinessState>,
    pub residents: f64,
    pub stores: Vec<ResourceType>,
    pub store_amount: f64,

    pub effects: Vec<EffectSpec>,
    pub radius: u32,
    pub elliptical: bool,
    /// Area the effects were last registered on. A lookup record, not ownership.
    pub registered_area: Option<EffectArea>,

    pub mods: Vec<ModEffect>,
    pub mod_effects: Vec<EffectSpec>,
    pub mod_adjustments: ModAdjustments,
}

impl Structure {
    /// A bare structure; templates fill in the rest. The id is assigned when the
    /// city takes ownership.
    pub fn new(template: &str, name: &str, category: StructureCategory, width: u32, height: u32) -> Self {
        Self {
            id: StructureId(0),
            template: template.to_string(),
            name: name.to_string(),
            category,
            width,
            height,
            position: None,
            stackable: false,
            supports_stacking: false,
            built_on: None,
            connectivity: Connectivity::default(),
            last_efficiency: 0.0,
            upkeep_efficiency: 1.0,
            damaged_efficiency: 1.0,
            repair_cost: 0.0,
            flammable: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
            upkeep: Vec::new(),
            upkeep_scales_with_coverage: false,
            coverage: Coverage::default(),
            business: None,
            residents: 0.0,
            stores: Vec::new(),
            store_amount: 0.0,
            effects: Vec::new(),
            radius: 0,
            elliptical: false,
            registered_area: None,
            mods: Vec::new(),
            mod_effects: Vec::new(),
            mod_adjustments: ModAdjustments::default(),
        }
    }

    pub fn is_placed(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_business(&self) -> bool {
        self.business.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.business.as_ref().is_some_and(|b| b.failed)
    }

    /// 1 for non-businesses.
    pub fn patronage_efficiency(&self) -> f64 {
        self.business
            .as_ref()
            .map_or(1.0, |b| b.patronage_efficiency)
    }

    pub fn produces(&self, kind: ResourceType) -> bool {
        self.outputs.iter().any(|o| o.kind == kind)
    }

    pub fn output(&self, kind: ResourceType) -> Option<&Resource> {
        self.outputs.iter().find(|o| o.kind == kind)
    }

    pub fn output_mut(&mut self, kind: ResourceType) -> Option<&mut Resource> {
        self.outputs.iter_mut().find(|o| o.kind == kind)
    }

    /// Effects currently emitted: the template's plus any granted by mods.
    pub fn emitted_effects(&self) -> impl Iterator<Item = &EffectSpec> {
        self.effects.iter().chain(self.mod_effects.iter())
    }

    /// Area the emitted effects should cover at the current position and radius.
    pub fn effect_area(&self) -> Option<EffectArea> {
        let (x, y) = self.position?;
        Some(EffectArea {
            x,
            y,
            width: self.width,
            height: self.height,
            radius: self.effective_radius(),
            elliptical: self.elliptical,
        })
    }

    pub fn effective_radius(&self) -> u32 {
        self.radius + self.mod_adjustments.radius
    }

    pub fn effective_store_amount(&self) -> f64 {
        self.store_amount + self.mod_adjustments.store_amount
    }

    pub fn effective_residents(&self) -> f64 {
        self.residents + self.mod_adjustments.residents
    }

    pub fn effective_patron_cap(&self) -> f64 {
        self.business
            .as_ref()
            .map_or(0.0, |b| b.patron_cap + self.mod_adjustments.patron_cap)
    }

    /// Per-tick production rate of an output, including mod research bonuses.
    pub fn output_rate(&self, output: &Resource) -> f64 {
        let mut rate = output.production_rate;
        if output.kind == ResourceType::Research {
            rate += self.mod_adjustments.research_rate;
        }
        rate.max(0.0)
    }

    /// Tile-space centre of the footprint, for distance falloff.
    pub fn center(&self) -> Option<(f64, f64)> {
        let (x, y) = self.position?;
        Some((
            x as f64 + self.width as f64 / 2.0,
            y as f64 + self.height as f64 / 2.0,
        ))
    }

    /// Upkeep bill for one long tick, after mod reductions and coverage scaling.
    pub fn effective_upkeep(&self, coverage_reference: f64) -> Vec<(ResourceType, f64)> {
        let reduction = (1.0 - self.mod_adjustments.upkeep_reduction).clamp(0.0, 1.0);
        let coverage = if self.upkeep_scales_with_coverage && coverage_reference > 0.0 {
            0.5 + 0.5 * (self.coverage.citizens / coverage_reference).min(1.0)
        } else {
            1.0
        };
        self.upkeep
            .iter()
            .map(|&(kind, cost)| (kind, cost * reduction * coverage))
            .collect()
    }
}
