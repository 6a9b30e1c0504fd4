mod common;

use city_sim::flush::{flush_to_jsonl, load_from_jsonl};
use city_sim::model::*;
use common::{build_test_city, read_lines};

#[test]
fn flush_produces_valid_jsonl_files() {
    let city = build_test_city();
    let dir = tempfile::tempdir().unwrap();

    flush_to_jsonl(&city, dir.path()).unwrap();

    let header_path = dir.path().join("city.json");
    let resources_path = dir.path().join("resources.jsonl");
    let structures_path = dir.path().join("structures.jsonl");
    let events_path = dir.path().join("events.jsonl");
    assert!(header_path.exists());

    let resources_lines = read_lines(&resources_path);
    let structures_lines = read_lines(&structures_path);
    let events_lines = read_lines(&events_path);
    assert_eq!(resources_lines.len(), ResourceType::ALL.len());
    assert_eq!(structures_lines.len(), 5, "placed and inventoried structures");
    assert_eq!(events_lines.len(), city.events.len());

    for line in &resources_lines {
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(v.get("kind").is_some());
        assert!(v.get("amount").is_some());
        // Special resources must not serialize their capacity as null.
        assert!(v["capacity"].is_number(), "capacity not a number: {line}");
    }

    for line in &structures_lines {
        let v: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(v.get("id").is_some());
        assert!(v.get("template").is_some());
        assert!(v.get("position").is_some());
    }

    let header: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&header_path).unwrap()).unwrap();
    assert_eq!(header["name"], "Harbourside");
    assert_eq!(header["width"], 16);
    assert_eq!(header["current_time"]["day"], 0);
}

#[test]
fn load_restores_what_was_flushed() {
    let city = build_test_city();
    let dir = tempfile::tempdir().unwrap();
    flush_to_jsonl(&city, dir.path()).unwrap();

    let loaded = load_from_jsonl(dir.path()).unwrap();
    assert_eq!(loaded.name, city.name);
    assert_eq!(loaded.ledger, city.ledger);
    assert_eq!(loaded.structures, city.structures);
    assert_eq!(loaded.events, city.events);
    assert_eq!(loaded.grid, city.grid);
    assert_eq!(loaded.unlocked, city.unlocked);
    assert_eq!(loaded.notifications, city.notifications);
    assert_eq!(
        loaded.effect_grid.total_records(),
        city.effect_grid.total_records()
    );
    for s in city.placed() {
        assert_eq!(
            loaded.effect_grid.count_from(s.id),
            city.effect_grid.count_from(s.id),
            "records from {}",
            s.name
        );
    }
}

#[test]
fn load_from_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_from_jsonl(&dir.path().join("nope")).is_err());
}
