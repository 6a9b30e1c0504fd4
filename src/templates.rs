//! Built-in structure templates. Each returns an inventoried `Structure`
//! ready for `City::add_structure`.

use crate::model::{
    BusinessState, DynamicCalculation, EffectSpec, EffectType, Resource, ResourceType, Structure,
    StructureCategory,
};

pub const TEMPLATE_KEYS: &[&str] = &[
    "house",
    "corner_store",
    "restaurant",
    "market_stall",
    "coal_power_plant",
    "water_tower",
    "farm",
    "lumber_mill",
    "warehouse",
    "police_station",
    "clinic",
    "school",
    "fire_station",
    "park",
    "rooftop_solar",
];

pub fn by_key(key: &str) -> Option<Structure> {
    let structure = match key {
        "house" => house(),
        "corner_store" => corner_store(),
        "restaurant" => restaurant(),
        "market_stall" => market_stall(),
        "coal_power_plant" => coal_power_plant(),
        "water_tower" => water_tower(),
        "farm" => farm(),
        "lumber_mill" => lumber_mill(),
        "warehouse" => warehouse(),
        "police_station" => police_station(),
        "clinic" => clinic(),
        "school" => school(),
        "fire_station" => fire_station(),
        "park" => park(),
        "rooftop_solar" => rooftop_solar(),
        _ => return None,
    };
    Some(structure)
}

fn utilities(s: &mut Structure, power: bool, water: bool, road: bool) {
    s.connectivity.needs_power = power;
    s.connectivity.needs_water = water;
    s.connectivity.needs_road = road;
}

fn flunds_upkeep(amount: f64) -> Vec<(ResourceType, f64)> {
    vec![(ResourceType::Flunds, amount)]
}

// --- Residential & commerce ---

pub fn house() -> Structure {
    let mut s = Structure::new("house", "House", StructureCategory::Residential, 1, 1);
    utilities(&mut s, true, true, false);
    s.residents = 4.0;
    s.flammable = true;
    s.repair_cost = 20.0;
    s.effects = vec![EffectSpec::constant(EffectType::Patronage, 4.0)];
    s.radius = 4;
    s.elliptical = true;
    s
}

pub fn corner_store() -> Structure {
    let mut s = Structure::new("corner_store", "Corner Store", StructureCategory::Commercial, 1, 1);
    utilities(&mut s, true, false, true);
    s.business = Some(BusinessState::new(40.0, 50.0));
    s.inputs = vec![Resource::input(ResourceType::Produce, 0.5)];
    s.outputs = vec![Resource::output(ResourceType::Flunds, 3.0)];
    s.upkeep = flunds_upkeep(0.5);
    s.flammable = true;
    s.repair_cost = 40.0;
    s.effects = vec![EffectSpec::dynamic(
        EffectType::BusinessPresence,
        0.2,
        DynamicCalculation::BusinessConnectivityScaled,
    )];
    s.radius = 3;
    s
}

pub fn restaurant() -> Structure {
    let mut s = Structure::new("restaurant", "Restaurant", StructureCategory::Restaurant, 2, 1);
    utilities(&mut s, true, true, true);
    s.business = Some(BusinessState::new(60.0, 80.0));
    s.inputs = vec![
        Resource::input(ResourceType::Grain, 1.0),
        Resource::input(ResourceType::Produce, 1.0),
    ];
    s.outputs = vec![Resource::output(ResourceType::Flunds, 5.0)];
    s.upkeep = flunds_upkeep(1.0);
    s.flammable = true;
    s.repair_cost = 60.0;
    s.effects = vec![
        EffectSpec::dynamic(
            EffectType::BusinessPresence,
            0.3,
            DynamicCalculation::BusinessConnectivityScaled,
        ),
        EffectSpec::constant(EffectType::Luxury, 0.1),
    ];
    s.radius = 3;
    s
}

/// The stall a travelling merchant sets up. Needs nothing.
pub fn market_stall() -> Structure {
    let mut s = Structure::new("market_stall", "Market Stall", StructureCategory::Commercial, 1, 1);
    s.business = Some(BusinessState::new(20.0, 20.0));
    s.outputs = vec![Resource::output(ResourceType::Flunds, 1.5)];
    s.repair_cost = 10.0;
    s.effects = vec![EffectSpec::dynamic(
        EffectType::BusinessPresence,
        0.1,
        DynamicCalculation::BusinessConnectivityScaled,
    )];
    s.radius = 2;
    s
}

// --- Utilities & industry ---

pub fn coal_power_plant() -> Structure {
    let mut s = Structure::new(
        "coal_power_plant",
        "Coal Power Plant",
        StructureCategory::Energy,
        2,
        2,
    );
    utilities(&mut s, false, false, true);
    s.inputs = vec![Resource::input(ResourceType::Coal, 2.0)];
    s.outputs = vec![Resource::output(ResourceType::Power, 20.0)];
    s.upkeep = flunds_upkeep(2.0);
    s.flammable = true;
    s.repair_cost = 150.0;
    s.effects = vec![EffectSpec::dynamic(
        EffectType::Pollution,
        0.4,
        DynamicCalculation::EfficiencyScaled,
    )];
    s.radius = 4;
    s
}

pub fn water_tower() -> Structure {
    let mut s = Structure::new("water_tower", "Water Tower", StructureCategory::Energy, 1, 1);
    utilities(&mut s, true, false, false);
    s.outputs = vec![Resource::output(ResourceType::Water, 15.0)];
    s.upkeep = flunds_upkeep(0.5);
    s.repair_cost = 50.0;
    s
}

pub fn farm() -> Structure {
    let mut s = Structure::new("farm", "Farm", StructureCategory::Industrial, 2, 2);
    utilities(&mut s, false, true, false);
    s.outputs = vec![
        Resource::output(ResourceType::Grain, 4.0),
        Resource::output(ResourceType::Produce, 2.0),
    ];
    s.repair_cost = 30.0;
    s.effects = vec![EffectSpec::constant(EffectType::GreenSpace, 0.1)];
    s.radius = 1;
    s
}

pub fn lumber_mill() -> Structure {
    let mut s = Structure::new("lumber_mill", "Lumber Mill", StructureCategory::Industrial, 2, 2);
    utilities(&mut s, true, false, true);
    s.inputs = vec![Resource::input(ResourceType::Wood, 2.0)];
    s.outputs = vec![Resource::output(ResourceType::Lumber, 1.5)];
    s.upkeep = flunds_upkeep(1.0);
    s.flammable = true;
    s.repair_cost = 80.0;
    s.effects = vec![EffectSpec::dynamic(
        EffectType::Noise,
        0.3,
        DynamicCalculation::EfficiencyScaled,
    )];
    s.radius = 3;
    s
}

pub fn warehouse() -> Structure {
    let mut s = Structure::new("warehouse", "Warehouse", StructureCategory::Storage, 2, 2);
    s.stores = vec![
        ResourceType::Coal,
        ResourceType::Wood,
        ResourceType::Lumber,
        ResourceType::Iron,
        ResourceType::Steel,
        ResourceType::Clay,
        ResourceType::Bricks,
    ];
    s.store_amount = 100.0;
    s.supports_stacking = true;
    s.repair_cost = 60.0;
    s
}

// --- Services ---

fn service(template: &str, name: &str, effect: EffectType, magnitude: f64, radius: u32) -> Structure {
    let mut s = Structure::new(template, name, StructureCategory::Service, 1, 1);
    utilities(&mut s, true, false, true);
    s.upkeep_scales_with_coverage = true;
    s.repair_cost = 100.0;
    s.effects = vec![EffectSpec::dynamic(
        effect,
        magnitude,
        DynamicCalculation::EfficiencyScaled,
    )];
    s.radius = radius;
    s.elliptical = true;
    s
}

pub fn police_station() -> Structure {
    let mut s = service("police_station", "Police Station", EffectType::Police, 0.5, 6);
    s.upkeep = flunds_upkeep(3.0);
    s
}

pub fn clinic() -> Structure {
    let mut s = service("clinic", "Clinic", EffectType::Healthcare, 0.5, 5);
    s.upkeep = flunds_upkeep(3.0);
    s
}

pub fn school() -> Structure {
    let mut s = service("school", "School", EffectType::Education, 0.4, 5);
    s.width = 2;
    s.upkeep = flunds_upkeep(2.5);
    s.outputs = vec![Resource::output(ResourceType::Research, 0.5)];
    s
}

pub fn fire_station() -> Structure {
    let mut s = service("fire_station", "Fire Station", EffectType::FireProtection, 0.6, 6);
    s.upkeep = flunds_upkeep(3.0);
    s
}

pub fn park() -> Structure {
    let mut s = Structure::new("park", "Park", StructureCategory::Civic, 1, 1);
    s.effects = vec![
        EffectSpec::constant(EffectType::GreenSpace, 0.3),
        EffectSpec::constant(EffectType::LandValue, 0.1),
    ];
    s.radius = 2;
    s.elliptical = true;
    s
}

/// Sits on a roof (`supports_stacking` host).
pub fn rooftop_solar() -> Structure {
    let mut s = Structure::new("rooftop_solar", "Rooftop Solar", StructureCategory::Energy, 1, 1);
    s.stackable = true;
    s.outputs = vec![Resource::output(ResourceType::Power, 2.0)];
    s.repair_cost = 15.0;
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_key_resolves_to_its_template() {
        for key in TEMPLATE_KEYS {
            let s = by_key(key).unwrap_or_else(|| panic!("missing template {key}"));
            assert_eq!(&s.template, key);
        }
        assert!(by_key("castle").is_none());
    }

    #[test]
    fn market_stall_needs_nothing() {
        let s = market_stall();
        assert!(s.inputs.is_empty());
        assert!(s.connectivity.road_ok());
        assert_eq!(s.connectivity.powered_fraction(), 1.0);
    }
}
