use thiserror::Error;

use crate::id::StructureId;
use crate::model::ResourceType;

/// Rejections of player-facing commands. Simulation arithmetic never errors;
/// it saturates instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CityError {
    #[error("structure {0} does not exist")]
    UnknownStructure(StructureId),
    #[error("structure {0} is not placed on the grid")]
    NotPlaced(StructureId),
    #[error("footprint at ({x}, {y}) size {width}x{height} leaves the grid")]
    OutOfBounds {
        x: i64,
        y: i64,
        width: u32,
        height: u32,
    },
    #[error("tile ({x}, {y}) is occupied")]
    Occupied { x: u32, y: u32 },
    #[error("structure {0} has structures built on top of it")]
    HasDependents(StructureId),
    #[error("need {needed:.2} flunds, have {available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },
    #[error("{0} cannot be traded")]
    NotTradable(ResourceType),
    #[error("business {0} has not failed")]
    NotFailed(StructureId),
}
