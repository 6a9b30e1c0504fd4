use serde::{Deserialize, Serialize};

use crate::id::StructureId;
use crate::model::{EventKind, SimTimestamp};

/// A signal emitted by one system and consumed by others after all phases ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub time: SimTimestamp,
    pub kind: SignalKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalKind {
    /// A world event started. Instant events also emit `EventEnded` in the same tick.
    EventStarted { event: EventKind },

    EventEnded { event: EventKind },

    /// A disaster lowered a structure's `damaged_efficiency` by `amount`.
    StructureDamaged { structure_id: StructureId, amount: f64 },

    /// An event placed a new structure.
    StructureSpawned { structure_id: StructureId },

    /// A business crossed its failure threshold this tick.
    BusinessFailed { structure_id: StructureId },
}
