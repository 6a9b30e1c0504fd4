use tracing::{debug, info, warn};

use super::business::{BusinessTransition, record_patronage};
use super::context::TickContext;
use super::effects::structure_effect;
use super::signal::{Signal, SignalKind};
use super::system::{SimSystem, TickFrequency, TickPhase};
use crate::error::CityError;
use crate::id::StructureId;
use crate::model::{Capabilities, City, EffectType, ResourceType, Structure, StructureCategory};

/// Largest share of efficiency a restaurant loses when nobody can eat.
const RESTAURANT_FOOD_PENALTY: f64 = 0.2;
/// Same, for other revenue businesses.
const BUSINESS_FOOD_PENALTY: f64 = 0.1;

/// Phase 2: upkeep, patronage, efficiency, consumption and production for
/// every placed structure, then the citywide food draw.
pub struct EconomySystem;

impl SimSystem for EconomySystem {
    fn name(&self) -> &str {
        "economy"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::LongTick
    }

    fn phase(&self) -> TickPhase {
        TickPhase::Economy
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        let time = ctx.city.current_time;
        let capabilities = ctx.capabilities;
        ctx.city.ledger.begin_flow_period();

        for id in ctx.city.placed_ids() {
            if let Some(BusinessTransition::Failed) = tick_structure(ctx.city, id, capabilities) {
                warn!(structure = %id, "business failed");
                ctx.signals.push(Signal {
                    time,
                    kind: SignalKind::BusinessFailed { structure_id: id },
                });
            }
        }

        let sufficiency = update_food_sufficiency(ctx.city);
        debug!(%time, sufficiency, "economy settled");
    }
}

// ---------------------------------------------------------------------------
// Efficiency
// ---------------------------------------------------------------------------

/// Everything that feeds one structure's efficiency for one long tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyFactors {
    pub upkeep_efficiency: f64,
    pub powered_fraction: f64,
    pub watered_fraction: f64,
    pub needs_water: bool,
    pub water_scarce: bool,
    pub road_ok: bool,
    pub patronage_efficiency: f64,
    /// Uncapped; `f64::INFINITY` for structures without inputs.
    pub provisioned_fraction: f64,
    pub damaged_efficiency: f64,
    /// Largest share lost to hunger for this kind of structure.
    pub food_penalty: f64,
    pub food_sufficiency: f64,
}

impl Default for EfficiencyFactors {
    fn default() -> Self {
        Self {
            upkeep_efficiency: 1.0,
            powered_fraction: 1.0,
            watered_fraction: 1.0,
            needs_water: false,
            water_scarce: false,
            road_ok: true,
            patronage_efficiency: 1.0,
            provisioned_fraction: f64::INFINITY,
            damaged_efficiency: 1.0,
            food_penalty: 0.0,
            food_sufficiency: 1.0,
        }
    }
}

fn clip_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// The efficiency contract. Always in `[0, 1]`; NaN anywhere collapses to 0.
pub fn compute_efficiency(f: &EfficiencyFactors) -> f64 {
    if !(f.upkeep_efficiency > 0.0) || !(f.powered_fraction > 0.0) || !f.road_ok {
        return 0.0;
    }
    let water_effect = if f.needs_water && f.water_scarce {
        0.5 + 0.5 * f.watered_fraction.min(1.0)
    } else {
        1.0
    };
    let base =
        f.upkeep_efficiency * f.powered_fraction * water_effect * f.patronage_efficiency;
    let mut efficiency = base.min(f.provisioned_fraction).min(f.damaged_efficiency);
    efficiency *= 1.0 - f.food_penalty * (1.0 - clip_unit(f.food_sufficiency));
    clip_unit(efficiency)
}

fn food_penalty(category: StructureCategory) -> f64 {
    match category {
        StructureCategory::Restaurant => RESTAURANT_FOOD_PENALTY,
        c if c.is_revenue_business() => BUSINESS_FOOD_PENALTY,
        _ => 0.0,
    }
}

/// Weakest-link supply: the minimum over inputs of on-hand / per-tick need.
/// Uncapped, so 25 on hand against a need of 10 reads 2.5.
pub fn provisioned_fraction(city: &City, structure: &Structure) -> f64 {
    structure
        .inputs
        .iter()
        .filter_map(|input| {
            let need = input.consumption_rate * (1.0 - city.input_discount(input.kind));
            (need > 0.0).then(|| city.ledger.amount(input.kind) / need)
        })
        .fold(f64::INFINITY, f64::min)
}

pub fn efficiency_factors(
    city: &City,
    structure: &Structure,
    capabilities: Capabilities,
) -> EfficiencyFactors {
    let c = &structure.connectivity;
    EfficiencyFactors {
        upkeep_efficiency: structure.upkeep_efficiency,
        powered_fraction: c.powered_fraction(),
        watered_fraction: c.watered_fraction(),
        needs_water: c.needs_water,
        water_scarce: capabilities.contains(Capabilities::WATER_SCARCITY),
        road_ok: c.road_ok(),
        patronage_efficiency: structure.patronage_efficiency(),
        provisioned_fraction: provisioned_fraction(city, structure),
        damaged_efficiency: structure.damaged_efficiency,
        food_penalty: food_penalty(structure.category),
        food_sufficiency: city.scalars.food_sufficiency,
    }
}

/// Efficiency the structure would run at right now, without settling anything.
pub fn preview_efficiency(city: &City, id: StructureId, capabilities: Capabilities) -> f64 {
    city.structure(id)
        .map_or(0.0, |s| compute_efficiency(&efficiency_factors(city, s, capabilities)))
}

// ---------------------------------------------------------------------------
// Per-structure tick
// ---------------------------------------------------------------------------

/// Settle one long tick for a placed structure. Returns a business transition
/// if one happened.
pub fn tick_structure(
    city: &mut City,
    id: StructureId,
    capabilities: Capabilities,
) -> Option<BusinessTransition> {
    let structure = city.structure(id)?;
    let costs = structure.effective_upkeep(city.config.coverage_reference_citizens);
    let is_business = structure.is_business();

    let paid = city.ledger.affordable_fraction(&costs);
    city.ledger.spend_fraction(&costs, paid);

    let patrons = if is_business {
        structure_effect(city, id, &EffectType::Patronage)
    } else {
        0.0
    };

    let structure = city.expect_structure_mut(id);
    structure.upkeep_efficiency = paid;
    let patron_cap = structure.effective_patron_cap();
    let transition = structure
        .business
        .as_mut()
        .and_then(|b| record_patronage(b, patrons, patron_cap));

    let efficiency = preview_efficiency(city, id, capabilities);
    settle(city, id, efficiency);
    city.expect_structure_mut(id)
        .connectivity
        .reset_accumulators();
    transition
}

/// Consume inputs and produce outputs at `efficiency`, then record it.
///
/// Bonuses multiply output only; inputs are drawn at the unbonused rate.
fn settle(city: &mut City, id: StructureId, efficiency: f64) {
    let structure = &city.structures[&id];
    let inputs: Vec<(ResourceType, f64)> = structure
        .inputs
        .iter()
        .map(|i| (i.kind, i.consumption_rate))
        .collect();
    let outputs: Vec<(ResourceType, f64, bool)> = structure
        .outputs
        .iter()
        .map(|o| (o.kind, structure.output_rate(o), o.auto_collect))
        .collect();

    for (kind, rate) in inputs {
        let draw = rate * efficiency * (1.0 - city.input_discount(kind));
        city.ledger.consume(kind, draw);
    }

    let mut revenue = 0.0;
    for (kind, rate, auto_collect) in outputs {
        let amount = rate * efficiency * city.bonus_multiplier(kind);
        if auto_collect {
            let landed = city.ledger.produce(kind, amount);
            if kind == ResourceType::Flunds {
                revenue += landed;
            }
        } else if let Some(buffer) = city.expect_structure_mut(id).output_mut(kind) {
            buffer.amount += amount;
            buffer.clip();
        }
    }

    let accrual = city.config.business_value_accrual;
    let structure = city.expect_structure_mut(id);
    structure.last_efficiency = efficiency;
    if let Some(business) = structure.business.as_mut().filter(|b| !b.failed) {
        business.business_value += accrual * revenue;
    }
}

/// Citizens eat `food_per_capita` each from the food resources, in catalog
/// order. Returns the new sufficiency.
pub fn update_food_sufficiency(city: &mut City) -> f64 {
    let needed = city.population() * city.config.food_per_capita;
    if !(needed > 0.0) {
        city.scalars.food_sufficiency = 1.0;
        return 1.0;
    }
    let mut eaten = 0.0;
    for &kind in ResourceType::ALL.iter().filter(|k| k.is_food()) {
        eaten += city.ledger.consume(kind, needed - eaten);
    }
    let sufficiency = clip_unit(eaten / needed);
    city.scalars.food_sufficiency = sufficiency;
    sufficiency
}

// ---------------------------------------------------------------------------
// Player-facing commands
// ---------------------------------------------------------------------------

/// Start a stalled power producer partway through a tick.
///
/// A placed structure that produces power and sat at zero efficiency runs at
/// `remaining_fraction * min(1, provisioned fraction) * upkeep efficiency` for
/// the rest of the tick. Unpaid upkeep, no power or no road access leave it
/// stalled at 0. Returns the granted efficiency.
pub fn power_on_mid_tick(
    city: &mut City,
    id: StructureId,
    remaining_fraction: f64,
) -> Result<f64, CityError> {
    let structure = city.require(id)?;
    if !structure.is_placed() {
        return Err(CityError::NotPlaced(id));
    }
    if !structure.produces(ResourceType::Power)
        || structure.last_efficiency > 0.0
        || !(structure.upkeep_efficiency > 0.0)
        || !(structure.connectivity.powered_fraction() > 0.0)
        || !structure.connectivity.road_ok()
    {
        return Ok(0.0);
    }
    let affordable = provisioned_fraction(city, structure).min(1.0);
    let efficiency = clip_unit(
        remaining_fraction.clamp(0.0, 1.0) * affordable * structure.upkeep_efficiency,
    )
    .min(structure.damaged_efficiency);
    if efficiency > 0.0 {
        settle(city, id, efficiency);
        info!(structure = %id, efficiency, "powered on mid-tick");
    }
    Ok(efficiency)
}

/// Move everything buffered on a structure into the ledger, applying the
/// receipt bonus. Returns what landed, per type.
pub fn collect_outputs(
    city: &mut City,
    id: StructureId,
) -> Result<Vec<(ResourceType, f64)>, CityError> {
    let bonus = city.scalars.receipt_bonus;
    let structure = city.require_mut(id)?;
    let buffered: Vec<(ResourceType, f64)> = structure
        .outputs
        .iter_mut()
        .filter(|o| !o.auto_collect && o.amount > 0.0)
        .map(|o| (o.kind, std::mem::take(&mut o.amount)))
        .collect();
    Ok(buffered
        .into_iter()
        .map(|(kind, amount)| (kind, city.ledger.transfer_with_bonus(kind, amount, bonus)))
        .collect())
}

/// Restore full `damaged_efficiency` for `repair_cost` per point of damage.
/// Returns the price paid (0 if there was nothing to repair).
pub fn repair_structure(city: &mut City, id: StructureId) -> Result<f64, CityError> {
    let structure = city.require(id)?;
    let damage = 1.0 - structure.damaged_efficiency;
    if !(damage > 0.0) {
        return Ok(0.0);
    }
    let cost = structure.repair_cost * damage;
    let available = city.flunds();
    if !city
        .ledger
        .spend_if_affordable(&[(ResourceType::Flunds, cost)])
    {
        return Err(CityError::InsufficientFunds {
            needed: cost,
            available,
        });
    }
    city.expect_structure_mut(id).damaged_efficiency = 1.0;
    info!(structure = %id, cost, "structure repaired");
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BusinessState, Resource};

    fn placed(city: &mut City, structure: Structure) -> StructureId {
        let id = city.add_structure(structure);
        city.expect_structure_mut(id).position = Some((0, 0));
        id
    }

    fn coal_burner() -> Structure {
        let mut s = Structure::new("boiler", "Boiler", StructureCategory::Energy, 1, 1);
        s.inputs = vec![Resource::input(ResourceType::Coal, 10.0)];
        s.outputs = vec![Resource::output(ResourceType::Power, 20.0)];
        s
    }

    #[test]
    fn efficiency_stays_in_unit_interval_under_adversarial_inputs() {
        let wild = [
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            -5.0,
            0.0,
            0.3,
            1.0,
            7.0,
            f64::MAX,
        ];
        for &a in &wild {
            for &b in &wild {
                let f = EfficiencyFactors {
                    upkeep_efficiency: a,
                    powered_fraction: b,
                    watered_fraction: a,
                    needs_water: true,
                    water_scarce: true,
                    patronage_efficiency: b,
                    provisioned_fraction: a,
                    damaged_efficiency: b,
                    food_penalty: a,
                    food_sufficiency: b,
                    ..EfficiencyFactors::default()
                };
                let e = compute_efficiency(&f);
                assert!((0.0..=1.0).contains(&e), "{a} {b} -> {e}");
            }
        }
    }

    #[test]
    fn gates_zero_efficiency() {
        let ok = EfficiencyFactors::default();
        assert_eq!(compute_efficiency(&ok), 1.0);
        for f in [
            EfficiencyFactors { upkeep_efficiency: 0.0, ..ok },
            EfficiencyFactors { powered_fraction: 0.0, ..ok },
            EfficiencyFactors { road_ok: false, ..ok },
        ] {
            assert_eq!(compute_efficiency(&f), 0.0);
        }
    }

    #[test]
    fn water_scarcity_costs_at_most_half() {
        let dry = EfficiencyFactors {
            needs_water: true,
            watered_fraction: 0.0,
            ..EfficiencyFactors::default()
        };
        assert_eq!(compute_efficiency(&dry), 1.0);
        let scarce = EfficiencyFactors {
            water_scarce: true,
            ..dry
        };
        assert_eq!(compute_efficiency(&scarce), 0.5);
    }

    #[test]
    fn hunger_penalises_restaurants_more() {
        let hungry = EfficiencyFactors {
            food_sufficiency: 0.0,
            ..EfficiencyFactors::default()
        };
        let restaurant = EfficiencyFactors {
            food_penalty: food_penalty(StructureCategory::Restaurant),
            ..hungry
        };
        let shop = EfficiencyFactors {
            food_penalty: food_penalty(StructureCategory::Commercial),
            ..hungry
        };
        assert_eq!(compute_efficiency(&restaurant), 0.8);
        assert_eq!(compute_efficiency(&shop), 0.9);
        assert_eq!(food_penalty(StructureCategory::Industrial), 0.0);
    }

    #[test]
    fn surplus_input_is_uncapped_and_drawn_at_rate() {
        let mut city = City::new("Eco", 4, 4);
        city.ledger.set_amount(ResourceType::Coal, 25.0);
        let id = placed(&mut city, coal_burner());

        let s = city.structure(id).unwrap();
        assert_eq!(provisioned_fraction(&city, s), 2.5);

        tick_structure(&mut city, id, Capabilities::empty());
        assert_eq!(city.structure(id).unwrap().last_efficiency, 1.0);
        assert_eq!(city.ledger.amount(ResourceType::Coal), 15.0);
        assert_eq!(city.ledger.amount(ResourceType::Power), 20.0);
    }

    #[test]
    fn scarce_input_caps_output() {
        let mut city = City::new("Eco", 4, 4);
        city.ledger.set_amount(ResourceType::Coal, 5.0);
        let id = placed(&mut city, coal_burner());
        tick_structure(&mut city, id, Capabilities::empty());
        assert_eq!(city.structure(id).unwrap().last_efficiency, 0.5);
        assert_eq!(city.ledger.amount(ResourceType::Coal), 0.0);
        assert_eq!(city.ledger.amount(ResourceType::Power), 10.0);
    }

    #[test]
    fn bonus_enriches_output_not_input_draw() {
        let mut city = City::new("Eco", 4, 4);
        city.ledger.set_amount(ResourceType::Coal, 50.0);
        city.titles.insert("Boost".to_string(), 0.5);
        let id = placed(&mut city, coal_burner());
        tick_structure(&mut city, id, Capabilities::empty());
        assert_eq!(city.ledger.amount(ResourceType::Coal), 40.0);
        assert_eq!(city.ledger.amount(ResourceType::Power), 30.0);
    }

    #[test]
    fn partial_upkeep_scales_efficiency() {
        let mut city = City::new("Eco", 4, 4);
        city.ledger.set_amount(ResourceType::Flunds, 1.0);
        let mut s = Structure::new("kiosk", "Kiosk", StructureCategory::Service, 1, 1);
        s.upkeep = vec![(ResourceType::Flunds, 4.0)];
        let id = placed(&mut city, s);
        tick_structure(&mut city, id, Capabilities::empty());
        let s = city.structure(id).unwrap();
        assert_eq!(s.upkeep_efficiency, 0.25);
        assert_eq!(s.last_efficiency, 0.25);
        assert_eq!(city.flunds(), 0.0);
    }

    #[test]
    fn buffered_outputs_wait_for_collection() {
        let mut city = City::new("Eco", 4, 4);
        city.scalars.receipt_bonus = 0.5;
        let mut farm = Structure::new("farm", "Farm", StructureCategory::Industrial, 1, 1);
        farm.outputs = vec![Resource::output(ResourceType::Grain, 4.0)];
        let id = placed(&mut city, farm);
        tick_structure(&mut city, id, Capabilities::empty());
        assert_eq!(city.ledger.amount(ResourceType::Grain), 0.0);
        assert_eq!(city.structure(id).unwrap().output(ResourceType::Grain).unwrap().amount, 4.0);

        let collected = collect_outputs(&mut city, id).unwrap();
        assert_eq!(collected, vec![(ResourceType::Grain, 6.0)]);
        assert_eq!(city.ledger.amount(ResourceType::Grain), 6.0);
        assert!(collect_outputs(&mut city, id).unwrap().is_empty());
    }

    #[test]
    fn operating_business_accrues_value_from_revenue() {
        let mut city = City::new("Eco", 4, 4);
        let mut shop = Structure::new("shop", "Shop", StructureCategory::Commercial, 1, 1);
        shop.outputs = vec![Resource::output(ResourceType::Flunds, 10.0)];
        shop.business = Some(BusinessState::new(0.0, 5.0));
        let id = placed(&mut city, shop);
        tick_structure(&mut city, id, Capabilities::empty());
        assert_eq!(city.flunds(), 10.0);
        assert_eq!(city.structure(id).unwrap().business.as_ref().unwrap().business_value, 6.0);
    }

    #[test]
    fn stalled_power_plant_starts_mid_tick() {
        let mut city = City::new("Eco", 4, 4);
        city.ledger.set_amount(ResourceType::Coal, 5.0);
        let id = placed(&mut city, coal_burner());
        let granted = power_on_mid_tick(&mut city, id, 0.5).unwrap();
        assert_eq!(granted, 0.25);
        assert_eq!(city.ledger.amount(ResourceType::Coal), 2.5);
        assert_eq!(city.ledger.amount(ResourceType::Power), 5.0);
        // Already running: nothing more this tick.
        assert_eq!(power_on_mid_tick(&mut city, id, 0.5).unwrap(), 0.0);
    }

    #[test]
    fn unpaid_upkeep_keeps_plant_stalled_mid_tick() {
        let mut city = City::new("Eco", 4, 4);
        city.ledger.set_amount(ResourceType::Coal, 50.0);
        let mut s = coal_burner();
        s.upkeep = vec![(ResourceType::Flunds, 5.0)];
        let id = placed(&mut city, s);
        tick_structure(&mut city, id, Capabilities::empty());
        assert_eq!(city.structure(id).unwrap().upkeep_efficiency, 0.0);
        assert_eq!(city.structure(id).unwrap().last_efficiency, 0.0);

        assert_eq!(power_on_mid_tick(&mut city, id, 0.5).unwrap(), 0.0);
        assert_eq!(city.ledger.amount(ResourceType::Power), 0.0);
        assert_eq!(city.ledger.amount(ResourceType::Coal), 50.0);

        // Half the bill paid: the restart is scaled down with it.
        city.expect_structure_mut(id).upkeep_efficiency = 0.5;
        assert_eq!(power_on_mid_tick(&mut city, id, 0.5).unwrap(), 0.25);
        assert_eq!(city.ledger.amount(ResourceType::Power), 5.0);
    }

    #[test]
    fn power_on_requires_placement() {
        let mut city = City::new("Eco", 4, 4);
        let id = city.add_structure(coal_burner());
        assert_eq!(power_on_mid_tick(&mut city, id, 1.0), Err(CityError::NotPlaced(id)));
    }

    #[test]
    fn repair_charges_for_damage() {
        let mut city = City::new("Eco", 4, 4);
        let mut s = coal_burner();
        s.repair_cost = 100.0;
        s.damaged_efficiency = 0.75;
        let id = placed(&mut city, s);
        assert!(matches!(
            repair_structure(&mut city, id),
            Err(CityError::InsufficientFunds { .. })
        ));
        city.ledger.set_amount(ResourceType::Flunds, 40.0);
        assert_eq!(repair_structure(&mut city, id), Ok(25.0));
        assert_eq!(city.flunds(), 15.0);
        assert_eq!(repair_structure(&mut city, id), Ok(0.0));
    }

    #[test]
    fn food_sufficiency_tracks_shortfall() {
        let mut city = City::new("Eco", 4, 4);
        assert_eq!(update_food_sufficiency(&mut city), 1.0);
        city.ledger.set_amount(ResourceType::Population, 1000.0);
        city.ledger.set_amount(ResourceType::Grain, 4.0);
        city.ledger.set_amount(ResourceType::Produce, 1.0);
        assert_eq!(update_food_sufficiency(&mut city), 0.5);
        assert_eq!(city.ledger.amount(ResourceType::Grain), 0.0);
        assert_eq!(city.ledger.amount(ResourceType::Produce), 0.0);
    }
}
