use serde::{Deserialize, Serialize};

/// Output buffer a structure keeps for non-auto-collected outputs, in long ticks of production.
pub const OUTPUT_BUFFER_TICKS: f64 = 8.0;

/// Capacity of special resources. Finite so snapshots survive JSON.
pub const UNBOUNDED_CAPACITY: f64 = f64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ResourceType {
    Flunds,
    Population,
    Research,
    Tourists,
    Power,
    Water,
    Coal,
    Wood,
    Lumber,
    Iron,
    Steel,
    Clay,
    Bricks,
    Grain,
    Produce,
}

string_enum!(ResourceType {
    Flunds => "flunds",
    Population => "population",
    Research => "research",
    Tourists => "tourists",
    Power => "power",
    Water => "water",
    Coal => "coal",
    Wood => "wood",
    Lumber => "lumber",
    Iron => "iron",
    Steel => "steel",
    Clay => "clay",
    Bricks => "bricks",
    Grain => "grain",
    Produce => "produce",
});

struct CatalogEntry {
    name: &'static str,
    capacity: f64,
    buy_price: f64,
    sell_price: f64,
    is_special: bool,
    auto_collect: bool,
}

impl ResourceType {
    fn catalog(self) -> CatalogEntry {
        use ResourceType::*;
        let special = |name| CatalogEntry {
            name,
            capacity: UNBOUNDED_CAPACITY,
            buy_price: 0.0,
            sell_price: 0.0,
            is_special: true,
            auto_collect: true,
        };
        let goods = |name, capacity, buy_price, sell_price| CatalogEntry {
            name,
            capacity,
            buy_price,
            sell_price,
            is_special: false,
            auto_collect: false,
        };
        match self {
            Flunds => special("Flunds"),
            Population => special("Population"),
            Research => special("Research"),
            Tourists => special("Tourists"),
            Power => CatalogEntry {
                auto_collect: true,
                ..goods("Power", 1000.0, 0.6, 0.3)
            },
            Water => CatalogEntry {
                auto_collect: true,
                ..goods("Water", 1000.0, 0.4, 0.2)
            },
            Coal => goods("Coal", 100.0, 2.0, 1.0),
            Wood => goods("Wood", 100.0, 1.5, 0.8),
            Lumber => goods("Lumber", 100.0, 3.0, 1.6),
            Iron => goods("Iron", 100.0, 3.5, 1.8),
            Steel => goods("Steel", 100.0, 7.0, 3.8),
            Clay => goods("Clay", 100.0, 1.2, 0.6),
            Bricks => goods("Bricks", 100.0, 3.0, 1.5),
            Grain => goods("Grain", 200.0, 1.0, 0.5),
            Produce => goods("Produce", 200.0, 1.4, 0.7),
        }
    }

    /// Resources citizens eat. Drives the citywide food sufficiency scalar.
    pub fn is_food(self) -> bool {
        matches!(self, ResourceType::Grain | ResourceType::Produce)
    }

    pub fn is_special(self) -> bool {
        self.catalog().is_special
    }
}

/// One resource type's bookkeeping, used both for the city ledger and for a
/// structure's own input/output instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub kind: ResourceType,
    pub name: String,
    pub amount: f64,
    pub capacity: f64,
    pub production_rate: f64,
    pub consumption_rate: f64,
    pub buy_price: f64,
    pub sell_price: f64,
    pub is_special: bool,
    pub auto_collect: bool,
}

impl Resource {
    /// A fresh ledger entry with catalog defaults and nothing on hand.
    pub fn new(kind: ResourceType) -> Self {
        let entry = kind.catalog();
        Self {
            kind,
            name: entry.name.to_string(),
            amount: 0.0,
            capacity: entry.capacity,
            production_rate: 0.0,
            consumption_rate: 0.0,
            buy_price: entry.buy_price,
            sell_price: entry.sell_price,
            is_special: entry.is_special,
            auto_collect: entry.auto_collect,
        }
    }

    /// A structure input consuming `rate` per long tick.
    pub fn input(kind: ResourceType, rate: f64) -> Self {
        Self {
            consumption_rate: rate,
            capacity: 0.0,
            ..Self::new(kind)
        }
    }

    /// A structure output producing `rate` per long tick, with a local buffer
    /// for outputs awaiting collection.
    pub fn output(kind: ResourceType, rate: f64) -> Self {
        Self {
            production_rate: rate,
            capacity: rate * OUTPUT_BUFFER_TICKS,
            ..Self::new(kind)
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self.clip();
        self
    }

    /// Room left before hitting capacity.
    pub fn headroom(&self) -> f64 {
        (self.capacity - self.amount).max(0.0)
    }

    /// Restore `0 <= amount <= capacity`. Special resources are only floored at 0.
    pub fn clip(&mut self) {
        if self.amount.is_nan() {
            self.amount = 0.0;
        }
        self.amount = self.amount.max(0.0);
        if !self.is_special {
            self.amount = self.amount.min(self.capacity.max(0.0));
        }
    }
}
