use city_sim::model::*;
use city_sim::sim::{apply_mods, flush_pending, place_structure};
use city_sim::templates;

/// A small saved-game-shaped city: stacked storage, a house with mods, a park,
/// an unplaced clinic, and an event that has run.
pub fn build_test_city() -> City {
    let mut city = City::new("Harbourside", 16, 16);
    city.ledger.set_amount(ResourceType::Flunds, 320.0);
    city.ledger.set_amount(ResourceType::Coal, 40.0);

    let warehouse = city.add_structure(templates::warehouse());
    let solar = city.add_structure(templates::rooftop_solar());
    let house = city.add_structure(templates::house());
    let park = city.add_structure(templates::park());
    city.add_structure(templates::clinic());

    place_structure(&mut city, warehouse, 2, 2, Capabilities::empty()).unwrap();
    place_structure(&mut city, solar, 3, 3, Capabilities::empty()).unwrap();
    place_structure(&mut city, house, 8, 8, Capabilities::empty()).unwrap();
    place_structure(&mut city, park, 9, 8, Capabilities::empty()).unwrap();
    apply_mods(
        &mut city,
        house,
        vec![
            ModEffect::new(ModKey::Population.effect_type(), 2.0),
            ModEffect::new(EffectType::LandValue, 0.2),
        ],
    )
    .unwrap();
    flush_pending(&mut city);

    city.events[0].activation_count = 1;
    city.events[0].state = EventState::Ended;
    city.unlock("market_stall");
    city.notify("Welcome", "Harbourside was founded");
    city
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
