// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Bench Report Types
//
// Structured JSON written to benchmark-results/ after each suite run.

use serde::Serialize;

use market_sim_engine::aggregate::MetricStats;
use market_sim_engine::ConfigOverrides;

// ─── Per-Scenario ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub scenario_name: String,
    pub label: String,
    pub category: String,
    pub overrides: ConfigOverrides,
    pub iterations: u32,
    pub seed: u64,
    pub executor: String,
    pub elapsed_ms: u128,
    pub trials_per_sec: f64,
    pub net_profit: MetricStats,
    pub roi: MetricStats,
    pub unsold_pct: MetricStats,
    pub break_even_week: Option<MetricStats>,
    pub prob_loss: Option<f64>,
    pub net_loss_var95: Option<f64>,
    pub net_loss_cvar95: Option<f64>,
    /// Present when the run was rejected.
    pub error: Option<String>,
}

// ─── Equivalence ────────────────────────────────────────────────────────────

/// Parallel and sequential execution of one configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquivalenceCheck {
    pub seed: u64,
    pub iterations: u32,
    pub units: usize,
    pub parallel_executor: String,
    pub parallel_mean_net_profit: f64,
    pub sequential_mean_net_profit: f64,
    pub relative_difference: f64,
    pub identical_samples: bool,
    pub passes: bool,
}

// ─── Top-Level ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub units: usize,
    pub summary: Summary,
    pub equivalence: Option<EquivalenceCheck>,
    pub scenarios: Vec<ScenarioReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub completed: usize,
    pub rejected: usize,
    pub suite_ms: u128,
}
