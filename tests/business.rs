use city_sim::model::*;
use city_sim::sim::{
    EconomySystem, EffectFieldSystem, ProgressionSystem, SignalKind, reopen_business,
};
use city_sim::templates;
use city_sim::testutil::*;
use city_sim::CityError;

/// A patron source emitting a flat `patrons` over a wide radius.
fn crowd(patrons: f64) -> Structure {
    let mut s = Structure::new("crowd", "Crowd", StructureCategory::Residential, 1, 1);
    s.effects = vec![EffectSpec::constant(EffectType::Patronage, patrons)];
    s.radius = 5;
    s
}

fn restaurant_town(patrons: f64) -> (City, city_sim::StructureId) {
    let mut city = City::new("Diner", 12, 12);
    placed(&mut city, crowd(patrons), 4, 4);
    let restaurant = placed(&mut city, templates::restaurant(), 5, 4);
    tick_system(&mut city, &mut EffectFieldSystem, 0, 1);
    (city, restaurant)
}

#[test]
fn business_fails_on_twentieth_low_tick() {
    // Restaurant cap is 60; 5 patrons is under a tenth of it.
    let (mut city, restaurant) = restaurant_town(5.0);

    for tick in 1..20 {
        let signals = tick_system(&mut city, &mut EconomySystem, 0, 1);
        assert!(
            !has_signal(&signals, |s| matches!(s, SignalKind::BusinessFailed { .. })),
            "failed early on tick {tick}"
        );
    }
    let business = city.structure(restaurant).unwrap().business.clone().unwrap();
    assert_eq!(business.failure_counter, 19);
    assert!(!business.failed);

    let signals = tick_system(&mut city, &mut EconomySystem, 0, 1);
    assert_eq!(
        count_signals(&signals, |s| *s == SignalKind::BusinessFailed {
            structure_id: restaurant
        }),
        1
    );
    assert!(city.structure(restaurant).unwrap().is_failed());

    // Failure is sticky and is not reported again.
    let signals = tick_system(&mut city, &mut EconomySystem, 0, 1);
    assert!(signals.is_empty());
    assert_eq!(city.structure(restaurant).unwrap().patronage_efficiency(), 0.0);

    deliver_signals(&mut city, &mut ProgressionSystem, &[], 1);
    assert!(city.notifications.is_empty());
}

#[test]
fn adequate_patronage_keeps_business_open() {
    let (mut city, restaurant) = restaurant_town(30.0);
    for _ in 0..40 {
        tick_system(&mut city, &mut EconomySystem, 0, 1);
    }
    let s = city.structure(restaurant).unwrap();
    assert!(!s.is_failed());
    assert_eq!(s.patronage_efficiency(), 0.5);
}

#[test]
fn reopening_costs_business_value() {
    let (mut city, restaurant) = restaurant_town(0.5);
    assert_eq!(
        reopen_business(&mut city, restaurant),
        Err(CityError::NotFailed(restaurant))
    );
    for _ in 0..20 {
        tick_system(&mut city, &mut EconomySystem, 0, 1);
    }
    assert!(city.structure(restaurant).unwrap().is_failed());

    let value = city.structure(restaurant).unwrap().business.as_ref().unwrap().business_value;
    assert!(matches!(
        reopen_business(&mut city, restaurant),
        Err(CityError::InsufficientFunds { .. })
    ));
    city.ledger.set_amount(ResourceType::Flunds, value + 1.0);
    assert_eq!(reopen_business(&mut city, restaurant), Ok(value));
    assert_eq!(city.flunds(), 1.0);
    assert!(!city.structure(restaurant).unwrap().is_failed());
}
