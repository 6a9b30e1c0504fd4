use std::io;
use std::path::PathBuf;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use super::context::TickContext;
use super::signal::Signal;
use super::system::{SimSystem, TickFrequency};
use crate::flush::flush_to_jsonl;
use crate::model::timestamp::{LONG_TICKS_PER_DAY, SHORT_TICKS_PER_LONG_TICK};
use crate::model::{Capabilities, City, SimTimestamp};

/// Configuration for a simulation run.
pub struct SimConfig {
    pub start_day: u64,
    pub num_days: u64,
    pub seed: u64,
    pub long_ticks_per_day: u32,
    pub short_ticks_per_long_tick: u32,
    pub capabilities: Capabilities,
    /// If set, flush city state every N days.
    pub flush_interval: Option<u64>,
    /// Directory to write flush checkpoints into.
    pub output_dir: Option<PathBuf>,
}

impl SimConfig {
    pub fn new(num_days: u64, seed: u64) -> Self {
        Self {
            start_day: 0,
            num_days,
            seed,
            long_ticks_per_day: LONG_TICKS_PER_DAY,
            short_ticks_per_long_tick: SHORT_TICKS_PER_LONG_TICK,
            capabilities: Capabilities::empty(),
            flush_interval: None,
            output_dir: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }
}

/// Returns true if a system with the given frequency should fire at this timestamp.
pub fn should_fire(freq: TickFrequency, time: SimTimestamp) -> bool {
    match freq {
        TickFrequency::LongTick => true,
        TickFrequency::Daily => time.tick() == 0,
    }
}

/// Sample every placed structure's connectivity `short_ticks` times.
pub fn accrue_short_ticks(city: &mut City, short_ticks: u32) {
    for structure in city.structures.values_mut() {
        if !structure.is_placed() {
            continue;
        }
        for _ in 0..short_ticks {
            structure.connectivity.sample();
        }
    }
}

/// Set `city.current_time` and run each system whose frequency matches.
///
/// Systems are first sorted by `phase()` (stable, so registration order breaks
/// ties). Phase order is part of the tick contract: events resolve before the
/// economy reads prices and damage, and effects are recomputed after both.
///
/// Signal delivery is **single-pass, non-cascading**:
///
/// 1. **Phases:** Each system's `tick()` runs in phase order. All signals
///    emitted are collected into a shared buffer.
/// 2. **React:** If any signals were emitted, each system's `handle_signals()`
///    is called with the full buffer as `ctx.inbox`. Signals pushed during this
///    pass are discarded at the end of the dispatch cycle.
///
/// Returns the signals emitted during the phases.
pub fn dispatch_systems(
    city: &mut City,
    systems: &mut [Box<dyn SimSystem>],
    rng: &mut dyn RngCore,
    capabilities: Capabilities,
    time: SimTimestamp,
) -> Vec<Signal> {
    city.current_time = time;
    systems.sort_by_key(|s| s.phase());

    let mut signals = Vec::new();
    for system in systems.iter_mut() {
        if should_fire(system.frequency(), time) {
            let mut ctx = TickContext {
                city,
                rng,
                capabilities,
                signals: &mut signals,
                inbox: &[],
            };
            system.tick(&mut ctx);
        }
    }

    if !signals.is_empty() {
        for system in systems.iter_mut() {
            if should_fire(system.frequency(), time) {
                let mut discarded = Vec::new();
                let mut ctx = TickContext {
                    city,
                    rng,
                    capabilities,
                    signals: &mut discarded,
                    inbox: &signals,
                };
                system.handle_signals(&mut ctx);
            }
        }
    }

    signals
}

/// Run the simulation for the configured number of days.
///
/// Creates a deterministic RNG from `config.seed`, so the same seed always
/// produces the same city. Each long tick first accrues its short ticks of
/// connectivity, then dispatches the systems.
pub fn run(
    city: &mut City,
    systems: &mut [Box<dyn SimSystem>],
    config: &SimConfig,
) -> io::Result<()> {
    let Some(finest) = systems.iter().map(|s| s.frequency()).max() else {
        return Ok(());
    };
    if config.num_days == 0 {
        return Ok(());
    }

    let mut rng = SmallRng::seed_from_u64(config.seed);
    let ticks_per_day = match finest {
        TickFrequency::Daily => 1,
        TickFrequency::LongTick => config.long_ticks_per_day.max(1),
    };

    for day_offset in 0..config.num_days {
        let day = config.start_day + day_offset;
        for tick in 0..ticks_per_day {
            accrue_short_ticks(city, config.short_ticks_per_long_tick);
            dispatch_systems(
                city,
                systems,
                &mut rng,
                config.capabilities,
                SimTimestamp::new(day, tick),
            );
        }

        if let (Some(interval), Some(dir)) = (config.flush_interval, &config.output_dir) {
            let is_last_day = day_offset == config.num_days - 1;
            if is_last_day || (interval > 0 && (day_offset + 1) % interval == 0) {
                flush_to_jsonl(city, &dir.join(format!("day_{day:06}")))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::model::{EventKind, Resource, ResourceType, Structure, StructureCategory};
    use crate::sim::default_systems;
    use crate::sim::events::start_event;
    use crate::sim::signal::SignalKind;
    use crate::sim::system::TickPhase;

    struct CountingSystem {
        sys_name: String,
        freq: TickFrequency,
        count: Rc<Cell<u32>>,
    }

    impl CountingSystem {
        fn new(name: &str, freq: TickFrequency, count: Rc<Cell<u32>>) -> Self {
            Self {
                sys_name: name.to_string(),
                freq,
                count,
            }
        }
    }

    impl SimSystem for CountingSystem {
        fn name(&self) -> &str {
            &self.sys_name
        }
        fn frequency(&self) -> TickFrequency {
            self.freq
        }
        fn phase(&self) -> TickPhase {
            TickPhase::Economy
        }
        fn tick(&mut self, _ctx: &mut TickContext) {
            self.count.set(self.count.get() + 1);
        }
    }

    #[test]
    fn should_fire_daily_at_first_tick() {
        assert!(should_fire(TickFrequency::Daily, SimTimestamp::new(3, 0)));
        assert!(!should_fire(TickFrequency::Daily, SimTimestamp::new(3, 1)));
        assert!(should_fire(TickFrequency::LongTick, SimTimestamp::new(3, 2)));
    }

    #[test]
    fn empty_systems_noop() {
        let mut city = City::new("Empty", 4, 4);
        let original_time = city.current_time;
        let mut systems: Vec<Box<dyn SimSystem>> = vec![];
        run(&mut city, &mut systems, &SimConfig::new(10, 0)).unwrap();
        assert_eq!(city.current_time, original_time);
    }

    #[test]
    fn long_tick_and_daily_counts() {
        let daily = Rc::new(Cell::new(0));
        let long = Rc::new(Cell::new(0));
        let mut systems: Vec<Box<dyn SimSystem>> = vec![
            Box::new(CountingSystem::new("daily", TickFrequency::Daily, daily.clone())),
            Box::new(CountingSystem::new("long", TickFrequency::LongTick, long.clone())),
        ];
        let mut city = City::new("Counting", 4, 4);
        run(&mut city, &mut systems, &SimConfig::new(3, 0)).unwrap();
        assert_eq!(daily.get(), 3);
        assert_eq!(long.get(), 3 * LONG_TICKS_PER_DAY);
        assert_eq!(city.current_time, SimTimestamp::new(2, LONG_TICKS_PER_DAY - 1));
    }

    #[test]
    fn daily_only_runs_once_per_day() {
        let daily = Rc::new(Cell::new(0));
        let mut systems: Vec<Box<dyn SimSystem>> = vec![Box::new(CountingSystem::new(
            "daily",
            TickFrequency::Daily,
            daily.clone(),
        ))];
        let mut city = City::new("Counting", 4, 4);
        run(&mut city, &mut systems, &SimConfig::new(5, 0)).unwrap();
        assert_eq!(daily.get(), 5);
        assert_eq!(city.current_time, SimTimestamp::new(4, 0));
    }

    struct PhaseLogger {
        sys_name: &'static str,
        phase: TickPhase,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl SimSystem for PhaseLogger {
        fn name(&self) -> &str {
            self.sys_name
        }
        fn frequency(&self) -> TickFrequency {
            TickFrequency::LongTick
        }
        fn phase(&self) -> TickPhase {
            self.phase
        }
        fn tick(&mut self, _ctx: &mut TickContext) {
            self.log.borrow_mut().push(self.sys_name);
        }
    }

    #[test]
    fn dispatcher_enforces_phase_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let logger = |sys_name, phase| -> Box<dyn SimSystem> {
            Box::new(PhaseLogger {
                sys_name,
                phase,
                log: log.clone(),
            })
        };
        let mut systems = vec![
            logger("effects", TickPhase::Effects),
            logger("economy", TickPhase::Economy),
            logger("events", TickPhase::Events),
            logger("economy2", TickPhase::Economy),
        ];
        let mut city = City::new("Order", 4, 4);
        let mut rng = SmallRng::seed_from_u64(0);
        dispatch_systems(
            &mut city,
            &mut systems,
            &mut rng,
            Capabilities::empty(),
            SimTimestamp::new(0, 0),
        );
        assert_eq!(*log.borrow(), vec!["events", "economy", "economy2", "effects"]);
    }

    #[test]
    fn signals_delivered_once_after_all_phases() {
        struct Emitter;

        impl SimSystem for Emitter {
            fn name(&self) -> &str {
                "emitter"
            }
            fn frequency(&self) -> TickFrequency {
                TickFrequency::LongTick
            }
            fn phase(&self) -> TickPhase {
                TickPhase::Events
            }
            fn tick(&mut self, ctx: &mut TickContext) {
                ctx.signals.push(Signal {
                    time: ctx.city.current_time,
                    kind: SignalKind::EventEnded {
                        event: crate::model::EventKind::Fire,
                    },
                });
            }
            fn handle_signals(&mut self, ctx: &mut TickContext) {
                // Re-emitted signals are dropped.
                ctx.signals.push(ctx.inbox[0].clone());
            }
        }

        struct Receiver {
            max_inbox_len: Rc<Cell<usize>>,
            calls: Rc<Cell<u32>>,
        }

        impl SimSystem for Receiver {
            fn name(&self) -> &str {
                "receiver"
            }
            fn frequency(&self) -> TickFrequency {
                TickFrequency::LongTick
            }
            fn phase(&self) -> TickPhase {
                TickPhase::Progression
            }
            fn tick(&mut self, _ctx: &mut TickContext) {}
            fn handle_signals(&mut self, ctx: &mut TickContext) {
                self.calls.set(self.calls.get() + 1);
                self.max_inbox_len
                    .set(self.max_inbox_len.get().max(ctx.inbox.len()));
            }
        }

        let max_inbox_len = Rc::new(Cell::new(0));
        let calls = Rc::new(Cell::new(0));
        let mut systems: Vec<Box<dyn SimSystem>> = vec![
            Box::new(Receiver {
                max_inbox_len: max_inbox_len.clone(),
                calls: calls.clone(),
            }),
            Box::new(Emitter),
        ];
        let mut city = City::new("Signals", 4, 4);
        run(&mut city, &mut systems, &SimConfig::new(2, 0)).unwrap();
        assert_eq!(calls.get(), 2 * LONG_TICKS_PER_DAY);
        assert_eq!(max_inbox_len.get(), 1);
    }

    struct QuakeTrigger;

    impl SimSystem for QuakeTrigger {
        fn name(&self) -> &str {
            "quake"
        }
        fn frequency(&self) -> TickFrequency {
            TickFrequency::LongTick
        }
        fn phase(&self) -> TickPhase {
            TickPhase::Events
        }
        fn tick(&mut self, ctx: &mut TickContext) {
            let time = ctx.city.current_time;
            let kinds = start_event(ctx.city, EventKind::Earthquake, ctx.capabilities, ctx.rng);
            ctx.signals
                .extend(kinds.into_iter().map(|kind| Signal { time, kind }));
        }
    }

    #[test]
    fn quake_damage_reaches_the_economy_in_the_same_tick() {
        let mut city = City::new("Quake", 4, 4);
        city.config.event_check_interval = 1000;
        let mut mill = Structure::new("mill", "Mill", StructureCategory::Industrial, 1, 1);
        mill.outputs = vec![Resource::output(ResourceType::Flunds, 10.0)];
        let id = city.add_structure(mill);
        city.expect_structure_mut(id).position = Some((1, 1));
        city.grid.fill(1, 1, 1, 1, Some(id));

        // Registered last; the phase sort still runs it before the economy.
        let mut systems = default_systems();
        systems.push(Box::new(QuakeTrigger));
        let mut rng = SmallRng::seed_from_u64(3);
        let signals = dispatch_systems(
            &mut city,
            &mut systems,
            &mut rng,
            Capabilities::empty(),
            SimTimestamp::new(0, 0),
        );

        let mill = city.structure(id).unwrap();
        assert!(mill.damaged_efficiency < 1.0);
        assert_eq!(mill.last_efficiency, mill.damaged_efficiency);
        assert!(signals.iter().any(|s| matches!(
            s.kind,
            SignalKind::StructureDamaged { structure_id, .. } if structure_id == id
        )));
    }
}
