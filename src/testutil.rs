use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::id::StructureId;
use crate::model::*;
use crate::sim::{
    Signal, SignalKind, SimConfig, SimSystem, TickContext, default_systems, place_structure, run,
};
use crate::templates;

// ---------------------------------------------------------------------------
// Tick execution helpers
// ---------------------------------------------------------------------------

/// Run a single system tick at the start of the given day. Returns emitted signals.
pub fn tick_system(city: &mut City, system: &mut dyn SimSystem, day: u64, seed: u64) -> Vec<Signal> {
    tick_system_at(city, system, SimTimestamp::from_day(day), Capabilities::empty(), seed)
}

/// Run a single system tick at a specific timestamp. Returns emitted signals.
pub fn tick_system_at(
    city: &mut City,
    system: &mut dyn SimSystem,
    time: SimTimestamp,
    capabilities: Capabilities,
    seed: u64,
) -> Vec<Signal> {
    city.current_time = time;
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut signals = Vec::new();
    let mut ctx = TickContext {
        city,
        rng: &mut rng,
        capabilities,
        signals: &mut signals,
        inbox: &[],
    };
    system.tick(&mut ctx);
    signals
}

/// Run a system's handle_signals with the given inbox. Returns newly emitted signals.
pub fn deliver_signals(
    city: &mut City,
    system: &mut dyn SimSystem,
    inbox: &[Signal],
    seed: u64,
) -> Vec<Signal> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut signals = Vec::new();
    let mut ctx = TickContext {
        city,
        rng: &mut rng,
        capabilities: Capabilities::empty(),
        signals: &mut signals,
        inbox,
    };
    system.handle_signals(&mut ctx);
    signals
}

/// Run a full tick + handle_signals cycle for a single system. Returns all signals.
pub fn full_tick(city: &mut City, system: &mut dyn SimSystem, day: u64, seed: u64) -> Vec<Signal> {
    let tick_signals = tick_system(city, system, day, seed);
    if tick_signals.is_empty() {
        return tick_signals;
    }
    let reaction_signals = deliver_signals(city, system, &tick_signals, seed);
    let mut all = tick_signals;
    all.extend(reaction_signals);
    all
}

/// Run whole days with the default systems. A city that has already ticked
/// continues with the day after its clock.
pub fn run_days(city: &mut City, num_days: u64, seed: u64) {
    let mut systems = default_systems();
    let mut config = SimConfig::new(num_days, seed);
    if city.current_time != SimTimestamp::default() {
        config.start_day = city.current_time.day() + 1;
    }
    run(city, &mut systems, &config).expect("simulation without flush cannot fail");
}

// ---------------------------------------------------------------------------
// City builders
// ---------------------------------------------------------------------------

/// Inventory a structure and place it, panicking if the site is invalid.
pub fn placed(city: &mut City, structure: Structure, x: i64, y: i64) -> StructureId {
    let id = city.add_structure(structure);
    place_structure(city, id, x, y, Capabilities::empty())
        .unwrap_or_else(|e| panic!("placing {id} at ({x}, {y}): {e}"));
    id
}

/// Inventory and place a built-in template.
pub fn placed_template(city: &mut City, key: &str, x: i64, y: i64) -> StructureId {
    let structure =
        templates::by_key(key).unwrap_or_else(|| panic!("unknown template {key}"));
    placed(city, structure, x, y)
}

/// A structure with no needs, one Flunds output and an optional input.
pub fn workshop(output: f64, input: Option<(ResourceType, f64)>) -> Structure {
    let mut s = Structure::new("workshop", "Workshop", StructureCategory::Industrial, 1, 1);
    s.outputs = vec![Resource::output(ResourceType::Flunds, output)];
    if let Some((kind, rate)) = input {
        s.inputs = vec![Resource::input(kind, rate)];
    }
    s
}

/// Mark every placed structure as powered, watered and on a road, as if it had
/// been connected for a whole long tick.
pub fn connect_all(city: &mut City) {
    for structure in city.structures.values_mut().filter(|s| s.is_placed()) {
        let c = &mut structure.connectivity;
        c.powered = true;
        c.watered = true;
        c.road_connected = true;
        c.seed_baseline(1);
    }
}

pub struct EconomicSetup {
    pub city: City,
    pub house: StructureId,
    pub store: StructureId,
    pub farm: StructureId,
    pub water: StructureId,
    pub power: StructureId,
}

/// A small settled town: a powered, watered house next to a corner store,
/// with a farm, a water tower and a coal plant stocked with fuel.
pub fn economic_scenario(flunds: f64) -> EconomicSetup {
    let mut city = City::new("Testville", 24, 24);
    city.ledger.set_amount(ResourceType::Flunds, flunds);
    city.ledger.set_amount(ResourceType::Coal, 80.0);
    let power = placed_template(&mut city, "coal_power_plant", 0, 0);
    let water = placed_template(&mut city, "water_tower", 3, 0);
    let farm = placed_template(&mut city, "farm", 0, 4);
    let house = placed_template(&mut city, "house", 10, 10);
    let store = placed_template(&mut city, "corner_store", 11, 10);
    connect_all(&mut city);
    EconomicSetup {
        city,
        house,
        store,
        farm,
        water,
        power,
    }
}

// ---------------------------------------------------------------------------
// Signal helpers
// ---------------------------------------------------------------------------

/// Check if any signal matches a predicate.
pub fn has_signal(signals: &[Signal], predicate: impl Fn(&SignalKind) -> bool) -> bool {
    signals.iter().any(|s| predicate(&s.kind))
}

/// Count signals matching a predicate.
pub fn count_signals(signals: &[Signal], predicate: impl Fn(&SignalKind) -> bool) -> usize {
    signals.iter().filter(|s| predicate(&s.kind)).count()
}

// ---------------------------------------------------------------------------
// Assertion helpers
// ---------------------------------------------------------------------------

/// Assert a float is approximately equal, with a named context message.
pub fn assert_approx(actual: f64, expected: f64, tolerance: f64, msg: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{msg}: expected ~{expected} (+-{tolerance}), got {actual}"
    );
}

/// Assert two cities produced from the same seed are identical in everything
/// a player can observe.
pub fn assert_deterministic(city1: &City, city2: &City) {
    assert_eq!(city1.ledger, city2.ledger, "ledger mismatch");
    assert_eq!(city1.structures, city2.structures, "structure mismatch");
    assert_eq!(city1.events, city2.events, "event registry mismatch");
    assert_eq!(
        city1.notifications.len(),
        city2.notifications.len(),
        "notification count mismatch: {} vs {}",
        city1.notifications.len(),
        city2.notifications.len()
    );
    assert_eq!(city1.titles, city2.titles, "title mismatch");
}

/// Assert that the effect grid holds exactly `expected` records from `id`.
pub fn assert_records_from(city: &City, id: StructureId, expected: usize) {
    let actual = city.effect_grid.count_from(id);
    assert_eq!(
        actual, expected,
        "assert_records_from: structure {id} has {actual} records, expected {expected}"
    );
}
