// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Trial Runner
//
// Runs one multi-week trial against a `MarketModel`, and a contiguous batch
// of trials on a single seeded stream.

use crate::config::SimulationConfig;
use crate::correlation::{MarketScenario, ShockGenerator};
use crate::executor::Batch;
use crate::market::{MarketModel, SimulationError, WeekContext};
use crate::rng::SeededRng;
use crate::types::{TrialResult, WeeklyPoint};

pub struct TrialRunner<'a> {
    config: &'a SimulationConfig,
    model: &'a dyn MarketModel,
    shocks: Option<ShockGenerator>,
    initial_inventory: u64,
    weekly_marketing: f64,
}

impl<'a> TrialRunner<'a> {
    /// Expects a validated configuration.
    pub fn new(config: &'a SimulationConfig, model: &'a dyn MarketModel) -> Self {
        let shocks = config
            .market_model
            .shocks
            .as_ref()
            .map(|s| ShockGenerator::new(s.preset, s.intensity));
        Self {
            config,
            model,
            shocks,
            initial_inventory: config.initial_inventory(model.expected_demand(config)),
            weekly_marketing: config.weekly_marketing(),
        }
    }

    /// Runs every trial of `batch` consecutively on one stream seeded with
    /// the batch seed. The first failing trial aborts the batch.
    pub fn run_batch(&self, batch: &Batch) -> Result<Vec<TrialResult>, SimulationError> {
        let mut rng = SeededRng::new(batch.seed);
        (batch.start..batch.start + batch.len)
            .map(|trial| self.run_trial(trial, &mut rng))
            .collect()
    }

    pub fn run_trial(&self, trial: u32, rng: &mut SeededRng) -> Result<TrialResult, SimulationError> {
        let config = self.config;
        let cogs = config.offer.cogs;

        let mut scenario = MarketScenario::default();
        if let Some(shocks) = &self.shocks {
            shocks.apply(&mut scenario, rng);
        }

        let inventory_cost = cogs * self.initial_inventory as f64;
        let mut inventory = self.initial_inventory;
        let mut units_sold = 0_u64;
        let mut lost_sales = 0_u64;
        let mut disrupted_weeks = 0_u32;
        let mut revenue = 0.0_f64;
        let mut marketing_spent = 0.0_f64;
        let mut break_even_week = None;
        let mut weekly = Vec::with_capacity(config.weeks as usize);

        for week in 1..=config.weeks {
            let ctx = WeekContext {
                week,
                horizon_weeks: config.weeks,
                offer: &config.offer,
                population: &config.population,
                descriptor: &config.market_model,
                inventory_on_hand: inventory,
                weekly_marketing: self.weekly_marketing,
            };
            let outcome = self.model.simulate_week(&ctx, &scenario, rng)?;

            // Models may not sell stock they were not given.
            let sold = outcome.units_sold.min(inventory);
            inventory -= sold;
            units_sold += sold;
            lost_sales += outcome.lost_sales;
            revenue += outcome.revenue;
            marketing_spent += self.weekly_marketing;
            if outcome.supply_disrupted {
                disrupted_weeks += 1;
            }

            let cumulative_profit = revenue - inventory_cost - marketing_spent;
            if !cumulative_profit.is_finite() {
                return Err(SimulationError::UnstableState {
                    week,
                    quantity: "cumulative profit",
                    value: cumulative_profit,
                });
            }
            if break_even_week.is_none() && cumulative_profit >= 0.0 {
                break_even_week = Some(week);
            }

            weekly.push(WeeklyPoint {
                week,
                units_sold: sold as f64,
                revenue: outcome.revenue,
                cumulative_profit,
                inventory: inventory as f64,
                market_share: outcome.market_share,
            });
        }

        let total_cost = inventory_cost + config.offer.marketing_budget;
        let gross_profit = revenue - cogs * units_sold as f64;
        let net_profit = revenue - total_cost;
        let margin_pct = if revenue > 0.0 { gross_profit / revenue * 100.0 } else { 0.0 };

        Ok(TrialResult {
            trial,
            units_sold,
            revenue,
            total_cost,
            gross_profit,
            net_profit,
            roi: net_profit / total_cost,
            margin_pct,
            initial_inventory: self.initial_inventory,
            remaining_inventory: inventory,
            remaining_inventory_value: inventory as f64 * cogs,
            unsold_pct: inventory as f64 / self.initial_inventory as f64 * 100.0,
            lost_sales,
            disrupted_weeks,
            break_even_week,
            shocks: scenario.applied_shocks,
            weekly,
        })
    }
}
