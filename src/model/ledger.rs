use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::resource::{Resource, ResourceType};
use crate::config::PriceCurve;
use crate::error::CityError;

/// A list of per-type amounts, e.g. an upkeep bill or a construction cost.
pub type Costs = [(ResourceType, f64)];

/// Result of a market trade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub quantity: f64,
    pub flunds: f64,
}

/// The city's resource store: one `Resource` per type plus market multipliers.
///
/// All arithmetic saturates. Overproduction is silently lost at capacity and
/// underfunded consumption simply takes what is there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLedger {
    pub resources: BTreeMap<ResourceType, Resource>,
    pub buy_multiplier: f64,
    pub sell_multiplier: f64,
}

impl ResourceLedger {
    /// A ledger holding every catalog resource at zero.
    pub fn new() -> Self {
        Self {
            resources: ResourceType::ALL
                .iter()
                .map(|&kind| (kind, Resource::new(kind)))
                .collect(),
            buy_multiplier: 1.0,
            sell_multiplier: 1.0,
        }
    }

    pub fn get(&self, kind: ResourceType) -> Option<&Resource> {
        self.resources.get(&kind)
    }

    pub fn get_mut(&mut self, kind: ResourceType) -> &mut Resource {
        self.resources
            .entry(kind)
            .or_insert_with(|| Resource::new(kind))
    }

    pub fn amount(&self, kind: ResourceType) -> f64 {
        self.get(kind).map_or(0.0, |r| r.amount)
    }

    pub fn capacity(&self, kind: ResourceType) -> f64 {
        self.get(kind).map_or(0.0, |r| r.capacity)
    }

    /// Set an amount directly (scenario setup, snapshot restore). Clipped.
    pub fn set_amount(&mut self, kind: ResourceType, amount: f64) {
        let r = self.get_mut(kind);
        r.amount = amount;
        r.clip();
    }

    /// Move a stock by `delta` without recording flow (residents moving in or out).
    /// Clipped; returns the change that actually landed.
    pub fn shift(&mut self, kind: ResourceType, delta: f64) -> f64 {
        let r = self.get_mut(kind);
        let before = r.amount;
        r.amount += delta;
        r.clip();
        r.amount - before
    }

    /// Add `amount`, clipped to capacity, and record it as production flow.
    /// Returns how much actually landed.
    pub fn produce(&mut self, kind: ResourceType, amount: f64) -> f64 {
        let landed = self.add(kind, amount);
        self.get_mut(kind).production_rate += landed;
        landed
    }

    /// Take up to `amount`, never below zero, and record it as consumption flow.
    /// Returns how much was actually taken.
    pub fn consume(&mut self, kind: ResourceType, amount: f64) -> f64 {
        let taken = self.remove(kind, amount);
        self.get_mut(kind).consumption_rate += taken;
        taken
    }

    /// Credit an externally earned amount (minigame reward, collected output)
    /// scaled by `1 + bonus`.
    pub fn transfer_with_bonus(&mut self, kind: ResourceType, amount: f64, bonus: f64) -> f64 {
        self.produce(kind, amount * (1.0 + bonus.max(0.0)))
    }

    fn add(&mut self, kind: ResourceType, amount: f64) -> f64 {
        if !(amount > 0.0) {
            return 0.0;
        }
        let r = self.get_mut(kind);
        let before = r.amount;
        r.amount += amount;
        r.clip();
        r.amount - before
    }

    fn remove(&mut self, kind: ResourceType, amount: f64) -> f64 {
        if !(amount > 0.0) {
            return 0.0;
        }
        let r = self.get_mut(kind);
        let taken = amount.min(r.amount);
        r.amount -= taken;
        r.clip();
        taken
    }

    /// Zero the per-period flow counters. Called at the start of every economy phase.
    pub fn begin_flow_period(&mut self) {
        for r in self.resources.values_mut() {
            r.production_rate = 0.0;
            r.consumption_rate = 0.0;
        }
    }

    /// Shift capacity by a storage structure's contribution. Capacity never goes below 0,
    /// and the on-hand amount is not touched here (see `auto_sell_excess`).
    /// Returns the change that actually landed.
    pub fn adjust_capacity(&mut self, kind: ResourceType, delta: f64) -> f64 {
        let r = self.get_mut(kind);
        if r.is_special {
            return 0.0;
        }
        let before = r.capacity;
        r.capacity = (r.capacity + delta).max(0.0);
        r.capacity - before
    }

    /// Sell whatever exceeds `capacity * threshold` at the current sell price.
    /// Returns the flunds earned.
    pub fn auto_sell_excess(&mut self, kind: ResourceType, threshold: f64) -> f64 {
        let sell_multiplier = self.sell_multiplier;
        let r = self.get_mut(kind);
        if r.is_special {
            return 0.0;
        }
        let limit = r.capacity * threshold.max(0.0);
        let excess = r.amount - limit;
        if !(excess > 0.0) {
            return 0.0;
        }
        r.amount = limit;
        let revenue = excess * r.sell_price * sell_multiplier;
        debug!(resource = %kind, excess, revenue, "auto-sold excess stock");
        self.add(ResourceType::Flunds, revenue);
        revenue
    }

    /// Smallest fraction of `costs` the ledger can cover, in `[0, 1]`.
    pub fn affordable_fraction(&self, costs: &Costs) -> f64 {
        costs
            .iter()
            .filter(|(_, cost)| *cost > 0.0)
            .map(|(kind, cost)| (self.amount(*kind) / cost).min(1.0))
            .fold(1.0, f64::min)
            .max(0.0)
    }

    /// Pay `fraction` of every cost.
    pub fn spend_fraction(&mut self, costs: &Costs, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        for &(kind, cost) in costs {
            self.consume(kind, cost * fraction);
        }
    }

    /// Pay all of `costs` if every one is covered; otherwise pay nothing.
    pub fn spend_if_affordable(&mut self, costs: &Costs) -> bool {
        if self.affordable_fraction(costs) < 1.0 {
            return false;
        }
        self.spend_fraction(costs, 1.0);
        true
    }

    /// Buy up to `quantity` (limited by free capacity).
    pub fn buy(
        &mut self,
        kind: ResourceType,
        quantity: f64,
        curve: PriceCurve,
    ) -> Result<Trade, CityError> {
        let r = self.get_mut(kind);
        if r.is_special {
            return Err(CityError::NotTradable(kind));
        }
        let quantity = quantity.max(0.0).min(r.headroom());
        let unit = r.buy_price * curve.factor(quantity, r.capacity);
        let cost = quantity * unit * self.buy_multiplier;
        let available = self.amount(ResourceType::Flunds);
        if cost > available {
            return Err(CityError::InsufficientFunds {
                needed: cost,
                available,
            });
        }
        self.remove(ResourceType::Flunds, cost);
        self.add(kind, quantity);
        Ok(Trade {
            quantity,
            flunds: cost,
        })
    }

    /// Sell up to `quantity` (limited by what is on hand).
    pub fn sell(
        &mut self,
        kind: ResourceType,
        quantity: f64,
        curve: PriceCurve,
    ) -> Result<Trade, CityError> {
        let sell_multiplier = self.sell_multiplier;
        let r = self.get_mut(kind);
        if r.is_special {
            return Err(CityError::NotTradable(kind));
        }
        let quantity = quantity.max(0.0).min(r.amount);
        let unit = r.sell_price * curve.factor(quantity, r.capacity);
        let revenue = quantity * unit * sell_multiplier;
        r.amount -= quantity;
        r.clip();
        self.add(ResourceType::Flunds, revenue);
        Ok(Trade {
            quantity,
            flunds: revenue,
        })
    }
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(kind: ResourceType, amount: f64) -> ResourceLedger {
        let mut ledger = ResourceLedger::new();
        ledger.set_amount(kind, amount);
        ledger
    }

    #[test]
    fn produce_then_consume_restores_amount() {
        let mut ledger = ledger_with(ResourceType::Coal, 25.0);
        let landed = ledger.produce(ResourceType::Coal, 12.5);
        assert_eq!(landed, 12.5);
        let taken = ledger.consume(ResourceType::Coal, 12.5);
        assert_eq!(taken, 12.5);
        assert_eq!(ledger.amount(ResourceType::Coal), 25.0);
    }

    #[test]
    fn produce_clips_at_capacity() {
        let mut ledger = ledger_with(ResourceType::Coal, 90.0);
        let landed = ledger.produce(ResourceType::Coal, 50.0);
        assert_eq!(landed, 10.0);
        assert_eq!(ledger.amount(ResourceType::Coal), 100.0);
        assert_eq!(ledger.get(ResourceType::Coal).unwrap().production_rate, 10.0);
    }

    #[test]
    fn consume_clips_at_zero() {
        let mut ledger = ledger_with(ResourceType::Wood, 4.0);
        let taken = ledger.consume(ResourceType::Wood, 10.0);
        assert_eq!(taken, 4.0);
        assert_eq!(ledger.amount(ResourceType::Wood), 0.0);
    }

    #[test]
    fn negative_and_nan_amounts_are_ignored() {
        let mut ledger = ledger_with(ResourceType::Wood, 4.0);
        assert_eq!(ledger.produce(ResourceType::Wood, -3.0), 0.0);
        assert_eq!(ledger.consume(ResourceType::Wood, f64::NAN), 0.0);
        assert_eq!(ledger.amount(ResourceType::Wood), 4.0);
    }

    #[test]
    fn special_resources_ignore_capacity() {
        let mut ledger = ResourceLedger::new();
        ledger.produce(ResourceType::Flunds, 1e12);
        assert_eq!(ledger.amount(ResourceType::Flunds), 1e12);
        ledger.adjust_capacity(ResourceType::Flunds, -1e300);
        assert_eq!(ledger.amount(ResourceType::Flunds), 1e12);
    }

    #[test]
    fn capacity_never_negative() {
        let mut ledger = ResourceLedger::new();
        let landed = ledger.adjust_capacity(ResourceType::Iron, -500.0);
        assert_eq!(ledger.capacity(ResourceType::Iron), 0.0);
        assert_eq!(landed, -100.0);
    }

    #[test]
    fn shift_reports_clipped_change() {
        let mut ledger = ledger_with(ResourceType::Population, 2.0);
        assert_eq!(ledger.shift(ResourceType::Population, -5.0), -2.0);
        assert_eq!(ledger.amount(ResourceType::Population), 0.0);
        assert_eq!(ledger.shift(ResourceType::Population, 3.0), 3.0);
    }

    #[test]
    fn auto_sell_moves_excess_into_flunds() {
        let mut ledger = ledger_with(ResourceType::Iron, 100.0);
        ledger.adjust_capacity(ResourceType::Iron, -40.0);
        let revenue = ledger.auto_sell_excess(ResourceType::Iron, 1.0);
        assert_eq!(ledger.amount(ResourceType::Iron), 60.0);
        assert_eq!(revenue, 40.0 * 1.8);
        assert_eq!(ledger.amount(ResourceType::Flunds), revenue);
    }

    #[test]
    fn affordable_fraction_takes_scarcest_cost() {
        let mut ledger = ledger_with(ResourceType::Flunds, 5.0);
        ledger.set_amount(ResourceType::Coal, 20.0);
        let costs = [(ResourceType::Flunds, 10.0), (ResourceType::Coal, 10.0)];
        assert_eq!(ledger.affordable_fraction(&costs), 0.5);
        assert!(!ledger.spend_if_affordable(&costs));
        assert_eq!(ledger.amount(ResourceType::Flunds), 5.0);
        assert_eq!(ledger.affordable_fraction(&[]), 1.0);
    }

    #[test]
    fn buy_spends_flunds_and_fills_stock() {
        let mut ledger = ledger_with(ResourceType::Flunds, 100.0);
        let trade = ledger
            .buy(ResourceType::Coal, 10.0, PriceCurve::Flat)
            .unwrap();
        assert_eq!(trade.quantity, 10.0);
        assert_eq!(trade.flunds, 20.0);
        assert_eq!(ledger.amount(ResourceType::Flunds), 80.0);
        assert_eq!(ledger.amount(ResourceType::Coal), 10.0);
    }

    #[test]
    fn buy_rejects_unaffordable_and_special() {
        let mut ledger = ledger_with(ResourceType::Flunds, 1.0);
        assert!(matches!(
            ledger.buy(ResourceType::Steel, 10.0, PriceCurve::Flat),
            Err(CityError::InsufficientFunds { .. })
        ));
        assert_eq!(
            ledger.buy(ResourceType::Research, 1.0, PriceCurve::Flat),
            Err(CityError::NotTradable(ResourceType::Research))
        );
    }

    #[test]
    fn sell_respects_multiplier_and_stock() {
        let mut ledger = ledger_with(ResourceType::Lumber, 10.0);
        ledger.sell_multiplier = 2.0;
        let trade = ledger
            .sell(ResourceType::Lumber, 50.0, PriceCurve::Flat)
            .unwrap();
        assert_eq!(trade.quantity, 10.0);
        assert_eq!(trade.flunds, 10.0 * 1.6 * 2.0);
        assert_eq!(ledger.amount(ResourceType::Lumber), 0.0);
    }

    #[test]
    fn flow_period_resets_rates() {
        let mut ledger = ResourceLedger::new();
        ledger.produce(ResourceType::Power, 30.0);
        ledger.consume(ResourceType::Power, 10.0);
        assert_eq!(ledger.get(ResourceType::Power).unwrap().consumption_rate, 10.0);
        ledger.begin_flow_period();
        let power = ledger.get(ResourceType::Power).unwrap();
        assert_eq!(power.production_rate, 0.0);
        assert_eq!(power.consumption_rate, 0.0);
        assert_eq!(power.amount, 20.0);
    }
}
