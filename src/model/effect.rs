use serde::{Deserialize, Serialize};

use crate::id::StructureId;

/// Gameplay category of an effect.
///
/// The named variants are the categories structures emit onto the grid. `Custom`
/// keys are only produced by mods and address structure fields instead of tiles
/// (see `ModKey`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EffectType {
    Police,
    FireProtection,
    Healthcare,
    Education,
    Pollution,
    Noise,
    Luxury,
    LandValue,
    BusinessPresence,
    Patronage,
    GreenSpace,
    Custom(String),
}

string_enum_open!(EffectType, "effect type", {
    Police => "police",
    FireProtection => "fire_protection",
    Healthcare => "healthcare",
    Education => "education",
    Pollution => "pollution",
    Noise => "noise",
    Luxury => "luxury",
    LandValue => "land_value",
    BusinessPresence => "business_presence",
    Patronage => "patronage",
    GreenSpace => "green_space",
});

/// Mod keys that act on a structure's own fields rather than on grid tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModKey {
    Storage,
    Population,
    Research,
    Upkeep,
    PatronCap,
    Radius,
}

impl ModKey {
    pub fn parse(effect_type: &EffectType) -> Option<Self> {
        let EffectType::Custom(key) = effect_type else {
            return None;
        };
        match key.as_str() {
            "storage" => Some(ModKey::Storage),
            "population" => Some(ModKey::Population),
            "research" => Some(ModKey::Research),
            "upkeep" => Some(ModKey::Upkeep),
            "patron_cap" => Some(ModKey::PatronCap),
            "radius" => Some(ModKey::Radius),
            _ => None,
        }
    }

    pub fn effect_type(self) -> EffectType {
        let key = match self {
            ModKey::Storage => "storage",
            ModKey::Population => "population",
            ModKey::Research => "research",
            ModKey::Upkeep => "upkeep",
            ModKey::PatronCap => "patron_cap",
            ModKey::Radius => "radius",
        };
        EffectType::Custom(key.to_string())
    }
}

/// How an effect's magnitude is evaluated at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicCalculation {
    #[default]
    Constant,
    /// Scaled by the source structure's last efficiency.
    EfficiencyScaled,
    /// Scaled by the source's patronage while it is road-connected and open.
    BusinessConnectivityScaled,
}

/// An effect a structure emits: category, base magnitude, and dynamics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub effect_type: EffectType,
    pub magnitude: f64,
    #[serde(default)]
    pub dynamic: DynamicCalculation,
}

impl EffectSpec {
    pub fn constant(effect_type: EffectType, magnitude: f64) -> Self {
        Self {
            effect_type,
            magnitude,
            dynamic: DynamicCalculation::Constant,
        }
    }

    pub fn dynamic(effect_type: EffectType, magnitude: f64, dynamic: DynamicCalculation) -> Self {
        Self {
            effect_type,
            magnitude,
            dynamic,
        }
    }
}

/// One effect record on one grid cell. Owned by the effect grid; the source is
/// a lookup key only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub source: StructureId,
    pub effect_type: EffectType,
    pub magnitude: f64,
    pub dynamic: DynamicCalculation,
}

impl Effect {
    pub fn from_spec(source: StructureId, spec: &EffectSpec) -> Self {
        Self {
            source,
            effect_type: spec.effect_type.clone(),
            magnitude: spec.magnitude,
            dynamic: spec.dynamic,
        }
    }
}

/// The tiles an effect set covers: a footprint expanded by a radius, either as a
/// rectangle or as an ellipse around the footprint centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub radius: u32,
    pub elliptical: bool,
}

impl EffectArea {
    /// Every in-bounds cell of the area, row-major.
    ///
    /// Footprint cells are always included, even when an ellipse would clip its corners.
    pub fn cells(&self, grid_width: u32, grid_height: u32) -> Vec<(u32, u32)> {
        let r = self.radius as i64;
        let x0 = (self.x as i64 - r).max(0);
        let y0 = (self.y as i64 - r).max(0);
        let x1 = (self.x as i64 + self.width as i64 + r).min(grid_width as i64);
        let y1 = (self.y as i64 + self.height as i64 + r).min(grid_height as i64);

        let cx = self.x as f64 + self.width as f64 / 2.0;
        let cy = self.y as f64 + self.height as f64 / 2.0;
        let rx = self.width as f64 / 2.0 + self.radius as f64;
        let ry = self.height as f64 / 2.0 + self.radius as f64;

        let mut cells = Vec::new();
        for ty in y0..y1 {
            for tx in x0..x1 {
                let (tx, ty) = (tx as u32, ty as u32);
                if self.elliptical && !self.in_footprint(tx, ty) {
                    let dx = (tx as f64 + 0.5 - cx) / rx;
                    let dy = (ty as f64 + 0.5 - cy) / ry;
                    if dx * dx + dy * dy > 1.0 {
                        continue;
                    }
                }
                cells.push((tx, ty));
            }
        }
        cells
    }

    pub fn in_footprint(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Whether any tile of the footprint `(x, y, w, h)` falls inside this area.
    pub fn overlaps(&self, x: u32, y: u32, width: u32, height: u32, grid: (u32, u32)) -> bool {
        self.cells(grid.0, grid.1)
            .iter()
            .any(|&(cx, cy)| cx >= x && cx < x + width && cy >= y && cy < y + height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_effect_types_round_trip() {
        let t = EffectType::try_from("storage".to_string()).unwrap();
        assert_eq!(t, EffectType::Custom("storage".to_string()));
        assert_eq!(ModKey::parse(&t), Some(ModKey::Storage));
        assert_eq!(ModKey::Storage.effect_type(), t);
        assert_eq!(
            EffectType::try_from("police".to_string()).unwrap(),
            EffectType::Police
        );
        assert!(EffectType::try_from(String::new()).is_err());
        assert_eq!(ModKey::parse(&EffectType::Police), None);
    }

    #[test]
    fn rectangular_area_expands_footprint() {
        let area = EffectArea {
            x: 5,
            y: 5,
            width: 2,
            height: 1,
            radius: 1,
            elliptical: false,
        };
        let cells = area.cells(20, 20);
        assert_eq!(cells.len(), 4 * 3);
        assert!(cells.contains(&(4, 4)));
        assert!(cells.contains(&(7, 6)));
        assert!(!cells.contains(&(8, 6)));
    }

    #[test]
    fn area_clips_to_grid() {
        let area = EffectArea {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
            radius: 2,
            elliptical: false,
        };
        assert_eq!(area.cells(10, 10).len(), 9);
    }

    #[test]
    fn elliptical_area_drops_corners_keeps_footprint() {
        let area = EffectArea {
            x: 10,
            y: 10,
            width: 1,
            height: 1,
            radius: 3,
            elliptical: true,
        };
        let cells = area.cells(30, 30);
        assert!(cells.contains(&(10, 10)));
        assert!(cells.contains(&(13, 10)) || cells.contains(&(12, 10)));
        assert!(!cells.contains(&(7, 7)));
        assert!(cells.len() < 49);

        let tight = EffectArea { radius: 0, ..area };
        assert_eq!(tight.cells(30, 30), vec![(10, 10)]);
    }

    #[test]
    fn dynamic_defaults_to_constant() {
        let spec: EffectSpec =
            serde_json::from_str(r#"{ "effect_type": "police", "magnitude": 0.5 }"#).unwrap();
        assert_eq!(spec.dynamic, DynamicCalculation::Constant);
    }
}
