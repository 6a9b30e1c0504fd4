use serde::{Deserialize, Serialize};

/// How the average unit price of a market trade responds to its volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PriceCurve {
    /// Every unit trades at the listed price.
    Flat,
    /// Average price falls linearly with `quantity / capacity`, never below `floor`
    /// (a fraction of the listed price).
    Linear { slope: f64, floor: f64 },
}

impl PriceCurve {
    /// Multiplier applied to the listed unit price for a trade of `quantity`
    /// units of a resource whose capacity is `capacity`.
    pub fn factor(&self, quantity: f64, capacity: f64) -> f64 {
        match *self {
            PriceCurve::Flat => 1.0,
            PriceCurve::Linear { slope, floor } => {
                if capacity <= 0.0 {
                    return floor.clamp(0.0, 1.0);
                }
                (1.0 - slope * quantity.max(0.0) / capacity).clamp(floor.clamp(0.0, 1.0), 1.0)
            }
        }
    }
}

/// Tunables for a city's economy and event catalog.
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityConfig {
    /// On storage removal, stock above `capacity * auto_sell_threshold` is sold.
    pub auto_sell_threshold: f64,
    pub buy_curve: PriceCurve,
    pub sell_curve: PriceCurve,
    /// Random event rolls happen at most once every this many long ticks.
    pub event_check_interval: u32,
    /// Food consumed per resident per long tick.
    pub food_per_capita: f64,
    /// Citizens at which a coverage-scaled service pays its full upkeep.
    pub coverage_reference_citizens: f64,
    /// Fraction of revenue a business folds into its value while operating.
    pub business_value_accrual: f64,
    /// Operating businesses needed for the commerce title.
    pub commerce_title_threshold: usize,
    /// Population needed for the metropolis title.
    pub metropolis_title_threshold: f64,
    /// Output bonus granted by each title.
    pub title_bonus: f64,
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            auto_sell_threshold: 1.0,
            buy_curve: PriceCurve::Flat,
            sell_curve: PriceCurve::Linear {
                slope: 0.25,
                floor: 0.5,
            },
            event_check_interval: 4,
            food_per_capita: 0.01,
            coverage_reference_citizens: 200.0,
            business_value_accrual: 0.1,
            commerce_title_threshold: 10,
            metropolis_title_threshold: 5000.0,
            title_bonus: 0.05,
        }
    }
}

impl CityConfig {
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config = CityConfig::from_json_str(r#"{ "auto_sell_threshold": 0.8 }"#).unwrap();
        assert_eq!(config.auto_sell_threshold, 0.8);
        assert_eq!(config.event_check_interval, 4);
        assert_eq!(config.buy_curve, PriceCurve::Flat);
    }

    #[test]
    fn price_curve_from_json() {
        let config = CityConfig::from_json_str(
            r#"{ "buy_curve": { "type": "linear", "slope": 0.5, "floor": 0.25 } }"#,
        )
        .unwrap();
        assert_eq!(
            config.buy_curve,
            PriceCurve::Linear {
                slope: 0.5,
                floor: 0.25
            }
        );
    }

    #[test]
    fn linear_curve_respects_floor() {
        let curve = PriceCurve::Linear {
            slope: 1.0,
            floor: 0.5,
        };
        assert_eq!(curve.factor(0.0, 100.0), 1.0);
        assert_eq!(curve.factor(25.0, 100.0), 0.75);
        assert_eq!(curve.factor(90.0, 100.0), 0.5);
        assert_eq!(PriceCurve::Flat.factor(1e9, 1.0), 1.0);
    }
}
