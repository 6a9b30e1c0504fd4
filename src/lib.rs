pub mod config;
pub mod error;
pub mod flush;
pub mod id;
pub mod model;
pub mod sim;
pub mod snapshot;
pub mod templates;
pub mod testutil;

pub use config::{CityConfig, PriceCurve};
pub use error::CityError;
pub use id::{IdGenerator, StructureId};
pub use model::{
    Capabilities, City, EffectType, EventKind, EventState, ModEffect, Resource, ResourceType,
    SimTimestamp, Structure, StructureCategory, WorldEvent,
};
pub use snapshot::CitySnapshot;
