use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::CityConfig;
use crate::model::{City, CityScalars, Notification, Resource, ResourceLedger, SimTimestamp};
use crate::snapshot::CitySnapshot;

/// Everything in a snapshot that is not one-per-line data.
#[derive(Serialize, Deserialize)]
struct CityHeader {
    name: String,
    width: u32,
    height: u32,
    config: CityConfig,
    buy_multiplier: f64,
    sell_multiplier: f64,
    scalars: CityScalars,
    titles: BTreeMap<String, f64>,
    unlocked: BTreeSet<String>,
    notifications: Vec<Notification>,
    event_check_counter: u32,
    next_id: u64,
    current_time: SimTimestamp,
}

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        items.push(serde_json::from_str(&line)?);
    }
    Ok(items)
}

/// Flush the city state to the given output directory.
///
/// Creates the output directory if it does not exist. Writes 4 files:
/// - `city.json`: name, dimensions, config, scalars and progression
/// - `resources.jsonl`: one ledger `Resource` per line
/// - `structures.jsonl`: one `Structure` per line, placed or not
/// - `events.jsonl`: one `WorldEvent` per line
pub fn flush_to_jsonl(city: &City, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;
    let snapshot = city.snapshot();

    let header = CityHeader {
        name: snapshot.name,
        width: snapshot.width,
        height: snapshot.height,
        config: snapshot.config,
        buy_multiplier: snapshot.ledger.buy_multiplier,
        sell_multiplier: snapshot.ledger.sell_multiplier,
        scalars: snapshot.scalars,
        titles: snapshot.titles,
        unlocked: snapshot.unlocked,
        notifications: snapshot.notifications,
        event_check_counter: snapshot.event_check_counter,
        next_id: snapshot.next_id,
        current_time: snapshot.current_time,
    };
    let mut writer = BufWriter::new(File::create(output_dir.join("city.json"))?);
    serde_json::to_writer_pretty(&mut writer, &header)?;
    writer.flush()?;

    write_jsonl(
        &output_dir.join("resources.jsonl"),
        snapshot.ledger.resources.values(),
    )?;
    write_jsonl(
        &output_dir.join("structures.jsonl"),
        snapshot.structures.iter(),
    )?;
    write_jsonl(&output_dir.join("events.jsonl"), snapshot.events.iter())?;
    Ok(())
}

/// Load a city written by [`flush_to_jsonl`].
pub fn load_from_jsonl(dir: &Path) -> io::Result<City> {
    let header: CityHeader =
        serde_json::from_reader(BufReader::new(File::open(dir.join("city.json"))?))?;
    let resources: Vec<Resource> = read_jsonl(&dir.join("resources.jsonl"))?;

    let snapshot = CitySnapshot {
        name: header.name,
        width: header.width,
        height: header.height,
        config: header.config,
        ledger: ResourceLedger {
            resources: resources.into_iter().map(|r| (r.kind, r)).collect(),
            buy_multiplier: header.buy_multiplier,
            sell_multiplier: header.sell_multiplier,
        },
        structures: read_jsonl(&dir.join("structures.jsonl"))?,
        events: read_jsonl(&dir.join("events.jsonl"))?,
        scalars: header.scalars,
        titles: header.titles,
        unlocked: header.unlocked,
        notifications: header.notifications,
        event_check_counter: header.event_check_counter,
        next_id: header.next_id,
        current_time: header.current_time,
    };
    City::from_snapshot(snapshot).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
