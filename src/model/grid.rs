use serde::{Deserialize, Serialize};

use super::effect::{Effect, EffectType};
use crate::id::StructureId;

/// Which structure sits on each tile. Stacked structures occupy the tile; the
/// structure underneath is reachable through `Structure::built_on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    pub width: u32,
    pub height: u32,
    cells: Vec<Option<StructureId>>,
}

impl OccupancyGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; (width * height) as usize],
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) as usize)
    }

    pub fn in_bounds(&self, x: i64, y: i64, width: u32, height: u32) -> bool {
        x >= 0
            && y >= 0
            && x + width as i64 <= self.width as i64
            && y + height as i64 <= self.height as i64
    }

    pub fn at(&self, x: u32, y: u32) -> Option<StructureId> {
        self.index(x, y).and_then(|i| self.cells[i])
    }

    pub fn fill(&mut self, x: u32, y: u32, width: u32, height: u32, id: Option<StructureId>) {
        for ty in y..y + height {
            for tx in x..x + width {
                if let Some(i) = self.index(tx, ty) {
                    self.cells[i] = id;
                }
            }
        }
    }

    /// Distinct occupants of a rectangle, in first-seen order.
    pub fn occupants(&self, x: u32, y: u32, width: u32, height: u32) -> Vec<Option<StructureId>> {
        let mut seen = Vec::new();
        for ty in y..y + height {
            for tx in x..x + width {
                let occupant = self.at(tx, ty);
                if !seen.contains(&occupant) {
                    seen.push(occupant);
                }
            }
        }
        seen
    }

    /// Every 1x1 empty tile, row-major.
    pub fn free_tiles(&self) -> Vec<(u32, u32)> {
        (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .filter(|&(x, y)| self.at(x, y).is_none())
            .collect()
    }
}

/// Per-tile effect records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectGrid {
    pub width: u32,
    pub height: u32,
    cells: Vec<Vec<Effect>>,
}

impl EffectGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Vec::new(); (width * height) as usize],
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| (y * self.width + x) as usize)
    }

    pub fn cell(&self, x: u32, y: u32) -> &[Effect] {
        match self.index(x, y) {
            Some(i) => &self.cells[i],
            None => &[],
        }
    }

    pub fn push(&mut self, x: u32, y: u32, effect: Effect) {
        if let Some(i) = self.index(x, y) {
            self.cells[i].push(effect);
        }
    }

    /// Drop every record from `source` on the given cells. Returns how many went.
    pub fn remove_source(&mut self, cells: &[(u32, u32)], source: StructureId) -> usize {
        let mut removed = 0;
        for &(x, y) in cells {
            if let Some(i) = self.index(x, y) {
                let before = self.cells[i].len();
                self.cells[i].retain(|e| e.source != source);
                removed += before - self.cells[i].len();
            }
        }
        removed
    }

    pub fn count_from(&self, source: StructureId) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|e| e.source == source)
            .count()
    }

    /// Records of one category on a tile.
    pub fn effects_of<'a>(
        &'a self,
        x: u32,
        y: u32,
        effect_type: &'a EffectType,
    ) -> impl Iterator<Item = &'a Effect> + 'a {
        self.cell(x, y)
            .iter()
            .filter(move |e| &e.effect_type == effect_type)
    }

    pub fn total_records(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }
}
