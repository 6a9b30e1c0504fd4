pub mod catalog;

use rand::RngCore;
use tracing::info;

use super::context::TickContext;
use super::signal::{Signal, SignalKind};
use super::system::{SimSystem, TickFrequency, TickPhase};
use crate::model::{Capabilities, City, EventFamily, EventKind, EventState};

/// Phase 1: poll dormant events, run active ones, end expired ones.
pub struct EventSystem;

impl SimSystem for EventSystem {
    fn name(&self) -> &str {
        "events"
    }

    fn frequency(&self) -> TickFrequency {
        TickFrequency::LongTick
    }

    fn phase(&self) -> TickPhase {
        TickPhase::Events
    }

    fn tick(&mut self, ctx: &mut TickContext) {
        let time = ctx.city.current_time;
        let roll = advance_check_counter(ctx.city);
        let catalog: Vec<(EventKind, bool)> = ctx
            .city
            .events
            .iter()
            .map(|e| (e.kind, e.is_active()))
            .collect();

        for (kind, active) in catalog {
            let emitted = if active {
                advance_event(ctx.city, kind)
            } else {
                poll_event(ctx.city, kind, roll, ctx.capabilities, ctx.rng)
            };
            ctx.signals
                .extend(emitted.into_iter().map(|kind| Signal { time, kind }));
        }
    }
}

/// Count one long tick against the shared roll throttle. Returns true when
/// this tick may roll, and restarts the count.
pub fn advance_check_counter(city: &mut City) -> bool {
    city.event_check_counter += 1;
    if city.event_check_counter >= city.config.event_check_interval.max(1) {
        city.event_check_counter = 0;
        true
    } else {
        false
    }
}

fn index_of(city: &City, kind: EventKind) -> usize {
    city.events
        .iter()
        .position(|e| e.kind == kind)
        .unwrap_or_else(|| panic!("event {kind} is not in {}'s registry", city.name))
}

/// One tick for a dormant or ended event: age it, and on a roll tick check
/// eligibility and start it.
///
/// # Panics
/// Panics if `kind` is not in the city's event registry.
pub fn poll_event(
    city: &mut City,
    kind: EventKind,
    roll: bool,
    capabilities: Capabilities,
    rng: &mut dyn RngCore,
) -> Vec<SignalKind> {
    let index = index_of(city, kind);
    let event = &mut city.events[index];
    event.ticks_skipped_since_last_activation += 1;
    let skipped = event.ticks_skipped_since_last_activation;
    if roll && catalog::is_eligible(city, kind, skipped, capabilities, rng) {
        start_event(city, kind, capabilities, rng)
    } else {
        Vec::new()
    }
}

/// Start an event now, regardless of eligibility. Instant events also end in
/// the same call, so they are never left active.
///
/// # Panics
/// Panics if `kind` is not in the city's event registry.
pub fn start_event(
    city: &mut City,
    kind: EventKind,
    capabilities: Capabilities,
    rng: &mut dyn RngCore,
) -> Vec<SignalKind> {
    let index = index_of(city, kind);
    let event = &mut city.events[index];
    event.activation_count += 1;
    event.ticks_skipped_since_last_activation = 0;
    event.duration_remaining = event.max_duration;
    event.state = EventState::Active;
    let (name, message) = (event.name.clone(), event.start_message.clone());
    let instant = kind.family() == EventFamily::Instant || event.max_duration == 0;

    let mut signals = vec![SignalKind::EventStarted { event: kind }];
    signals.extend(catalog::on_start(city, index, capabilities, rng));
    info!(city = %city.name, event = %kind, "event started");
    city.notify(&name, &message);

    if instant {
        signals.extend(end_event(city, kind));
    }
    signals
}

/// One tick for an active event: run its hook, then count down. Ends it when
/// the countdown reaches 0.
///
/// # Panics
/// Panics if `kind` is not in the city's event registry.
pub fn advance_event(city: &mut City, kind: EventKind) -> Vec<SignalKind> {
    let index = index_of(city, kind);
    catalog::on_tick(city, index);
    let event = &mut city.events[index];
    event.duration_remaining = event.duration_remaining.saturating_sub(1);
    if event.duration_remaining == 0 {
        end_event(city, kind)
    } else {
        Vec::new()
    }
}

/// Reverse outstanding effects and retire the event until its next activation.
/// Ending an event that is not active does nothing.
///
/// # Panics
/// Panics if `kind` is not in the city's event registry.
pub fn end_event(city: &mut City, kind: EventKind) -> Vec<SignalKind> {
    let index = index_of(city, kind);
    if !city.events[index].is_active() {
        return Vec::new();
    }
    catalog::on_end(city, index);
    let event = &mut city.events[index];
    event.state = EventState::Ended;
    event.duration_remaining = 0;
    let (name, message) = (event.name.clone(), event.end_message.clone());
    if !message.is_empty() {
        city.notify(&name, &message);
    }
    info!(city = %city.name, event = %kind, "event ended");
    vec![SignalKind::EventEnded { event: kind }]
}
