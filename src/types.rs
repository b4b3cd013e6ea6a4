// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Result Type Definitions

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateStatistics;
use crate::correlation::ShockRecord;
use crate::risk::RiskReport;

// ─── WeeklyPoint ────────────────────────────────────────────────────────────

/// One week of one trial, or the cross-trial average for that week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPoint {
    pub week: u32,
    pub units_sold: f64,
    pub revenue: f64,
    pub cumulative_profit: f64,
    pub inventory: f64,
    pub market_share: f64,
}

// ─── TrialResult ────────────────────────────────────────────────────────────

/// Cumulative outcome of one trial. Produced once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialResult {
    /// Global iteration index.
    pub trial: u32,
    pub units_sold: u64,
    pub revenue: f64,
    pub total_cost: f64,
    pub gross_profit: f64,
    pub net_profit: f64,
    pub roi: f64,
    pub margin_pct: f64,
    pub initial_inventory: u64,
    pub remaining_inventory: u64,
    pub remaining_inventory_value: f64,
    pub unsold_pct: f64,
    pub lost_sales: u64,
    pub disrupted_weeks: u32,
    /// First week whose cumulative profit is non-negative; `None` = never.
    pub break_even_week: Option<u32>,
    #[serde(default)]
    pub shocks: Option<ShockRecord>,
    pub weekly: Vec<WeeklyPoint>,
}

impl TrialResult {
    pub fn breaks_even(&self) -> bool {
        self.break_even_week.is_some()
    }
}

// ─── SimulationResult ───────────────────────────────────────────────────────

/// Self-contained output of one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    #[serde(flatten)]
    pub statistics: AggregateStatistics,
    pub raw_results: Vec<TrialResult>,
    pub weekly_averages: Vec<WeeklyPoint>,
    pub risk: Option<RiskReport>,
    pub seed: u64,
    pub iterations: u32,
    pub weeks: u32,
    /// Executor that produced the samples.
    pub executor: String,
}
