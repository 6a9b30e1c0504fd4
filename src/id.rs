use std::fmt;

use serde::{Deserialize, Serialize};

/// Registry key for a structure owned by the city.
///
/// Effects and stacked structures refer to their source/host through this id,
/// never through a borrowed reference, so a record can outlive its structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureId(pub u64);

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic ID generator for structures.
/// Ids are never reused, even after a structure is destroyed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn starting_from(start: u64) -> Self {
        Self { next: start }
    }

    pub fn next_id(&mut self) -> StructureId {
        let id = self.next;
        self.next += 1;
        StructureId(id)
    }

    /// Peek at the id the next call will hand out.
    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
