#[macro_use]
mod macros;

pub mod capabilities;
pub mod city;
pub mod effect;
pub mod event;
pub mod grid;
pub mod ledger;
pub mod resource;
pub mod structure;
pub mod timestamp;

pub use capabilities::Capabilities;
pub use city::{City, CityScalars, Notification, PendingEffectUpdate};
pub use effect::{DynamicCalculation, Effect, EffectArea, EffectSpec, EffectType, ModKey};
pub use event::{EventFamily, EventKind, EventState, WorldEvent};
pub use grid::{EffectGrid, OccupancyGrid};
pub use ledger::{Costs, ResourceLedger, Trade};
pub use resource::{Resource, ResourceType};
pub use structure::{
    BusinessState, Connectivity, Coverage, ModAdjustments, ModEffect, Structure,
    StructureCategory,
};
pub use timestamp::SimTimestamp;
