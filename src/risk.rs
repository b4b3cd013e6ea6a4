// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Risk Engine
//
// Tail metrics over per-trial loss vectors. Losses are positive numbers;
// gains enter as negative losses.

use serde::{Deserialize, Serialize};

use crate::aggregate::{nearest_rank_index, sorted, MetricStats};
use crate::types::TrialResult;

pub const CONFIDENCE_95: f64 = 0.95;
pub const CONFIDENCE_99: f64 = 0.99;

// ─── VaR / CVaR ─────────────────────────────────────────────────────────────

/// Nearest-rank Value-at-Risk: the loss at sorted index
/// `ceil(confidence × n) − 1`. `None` for an empty vector.
pub fn value_at_risk(losses: &[f64], confidence: f64) -> Option<f64> {
    if losses.is_empty() {
        return None;
    }
    let s = sorted(losses);
    Some(s[nearest_rank_index(s.len(), confidence)])
}

/// Mean of the sorted losses from the VaR index to the end, VaR point
/// included. `None` for an empty vector.
///
/// Accumulated as VaR plus the mean excess over VaR: every excess is
/// non-negative, so the result never rounds below VaR.
pub fn conditional_value_at_risk(losses: &[f64], confidence: f64) -> Option<f64> {
    if losses.is_empty() {
        return None;
    }
    let s = sorted(losses);
    let tail = &s[nearest_rank_index(s.len(), confidence)..];
    let var = tail[0];
    let excess = tail.iter().map(|x| x - var).sum::<f64>() / tail.len() as f64;
    Some(var + excess)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TailRisk {
    pub var95: f64,
    pub var99: f64,
    pub cvar95: f64,
    pub cvar99: f64,
}

impl TailRisk {
    pub fn from_losses(losses: &[f64]) -> Option<Self> {
        Some(Self {
            var95: value_at_risk(losses, CONFIDENCE_95)?,
            var99: value_at_risk(losses, CONFIDENCE_99)?,
            cvar95: conditional_value_at_risk(losses, CONFIDENCE_95)?,
            cvar99: conditional_value_at_risk(losses, CONFIDENCE_99)?,
        })
    }
}

fn probability(results: &[TrialResult], pred: impl Fn(&TrialResult) -> bool) -> f64 {
    results.iter().filter(|r| pred(r)).count() as f64 / results.len() as f64
}

// ─── Inventory ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRiskReport {
    /// Value of stock left on the shelf at horizon end.
    pub unsold_value: TailRisk,
    /// Capital not recovered: `max(0, totalCost − revenue)`.
    pub capital_exposure: TailRisk,
    pub prob_unsold_over_25_pct: f64,
    pub prob_unsold_over_50_pct: f64,
    pub prob_sell_out: f64,
    pub unsold_pct_stats: MetricStats,
    pub inventory_value_stats: MetricStats,
    pub unit_cost: f64,
}

pub fn analyze_inventory_risk(results: &[TrialResult], unit_cost: f64) -> Option<InventoryRiskReport> {
    if results.is_empty() {
        return None;
    }
    let unsold_value: Vec<f64> = results
        .iter()
        .map(|r| r.remaining_inventory as f64 * unit_cost)
        .collect();
    let exposure: Vec<f64> = results
        .iter()
        .map(|r| (r.total_cost - r.revenue).max(0.0))
        .collect();
    let unsold_pct: Vec<f64> = results.iter().map(|r| r.unsold_pct).collect();

    Some(InventoryRiskReport {
        unsold_value: TailRisk::from_losses(&unsold_value)?,
        capital_exposure: TailRisk::from_losses(&exposure)?,
        prob_unsold_over_25_pct: probability(results, |r| r.unsold_pct > 25.0),
        prob_unsold_over_50_pct: probability(results, |r| r.unsold_pct > 50.0),
        prob_sell_out: probability(results, |r| r.remaining_inventory == 0),
        unsold_pct_stats: MetricStats::from_samples(&unsold_pct),
        inventory_value_stats: MetricStats::from_samples(&unsold_value),
        unit_cost,
    })
}

// ─── Profitability ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitabilityRiskReport {
    /// Tail of `−netProfit`.
    pub net_loss: TailRisk,
    /// Tail of `max(0, −roi)`.
    pub roi_shortfall: TailRisk,
    pub prob_loss: f64,
    pub prob_negative_roi: f64,
    pub prob_no_break_even: f64,
    /// Over trials that break even; `None` when none do.
    pub break_even_stats: Option<MetricStats>,
    pub net_profit_stats: MetricStats,
    pub roi_stats: MetricStats,
}

pub fn analyze_profitability_risk(results: &[TrialResult]) -> Option<ProfitabilityRiskReport> {
    if results.is_empty() {
        return None;
    }
    let net_loss: Vec<f64> = results.iter().map(|r| -r.net_profit).collect();
    let shortfall: Vec<f64> = results.iter().map(|r| (-r.roi).max(0.0)).collect();
    let net_profit: Vec<f64> = results.iter().map(|r| r.net_profit).collect();
    let roi: Vec<f64> = results.iter().map(|r| r.roi).collect();
    let break_even: Vec<f64> = results
        .iter()
        .filter_map(|r| r.break_even_week.map(f64::from))
        .collect();

    Some(ProfitabilityRiskReport {
        net_loss: TailRisk::from_losses(&net_loss)?,
        roi_shortfall: TailRisk::from_losses(&shortfall)?,
        prob_loss: probability(results, |r| r.net_profit < 0.0),
        prob_negative_roi: probability(results, |r| r.roi < 0.0),
        prob_no_break_even: probability(results, |r| !r.breaks_even()),
        break_even_stats: MetricStats::non_empty(&break_even),
        net_profit_stats: MetricStats::from_samples(&net_profit),
        roi_stats: MetricStats::from_samples(&roi),
    })
}

// ─── Combined ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub inventory: InventoryRiskReport,
    pub profitability: ProfitabilityRiskReport,
}

pub fn analyze_risk(results: &[TrialResult], unit_cost: f64) -> Option<RiskReport> {
    Some(RiskReport {
        inventory: analyze_inventory_risk(results, unit_cost)?,
        profitability: analyze_profitability_risk(results)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn trial(net_profit: f64, remaining: u64, break_even_week: Option<u32>) -> TrialResult {
        let total_cost = 10_000.0;
        let revenue = total_cost + net_profit;
        TrialResult {
            trial: 0,
            units_sold: 100 - remaining,
            revenue,
            total_cost,
            gross_profit: revenue,
            net_profit,
            roi: net_profit / total_cost,
            margin_pct: 0.0,
            initial_inventory: 100,
            remaining_inventory: remaining,
            remaining_inventory_value: remaining as f64 * 20.0,
            unsold_pct: remaining as f64,
            lost_sales: 0,
            disrupted_weeks: 0,
            break_even_week,
            shocks: None,
            weekly: Vec::new(),
        }
    }

    #[test]
    fn var_and_cvar_on_known_vectors() {
        let ten: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(value_at_risk(&ten, 0.9), Some(9.0));
        assert_eq!(conditional_value_at_risk(&ten, 0.9), Some(9.5));

        let flat = [1.0, 2.0, 3.0, 4.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0];
        assert_eq!(value_at_risk(&flat, 0.9), Some(5.0));
        assert_eq!(conditional_value_at_risk(&flat, 0.9), Some(5.0));
    }

    #[test]
    fn var_is_nearest_rank_on_small_samples() {
        // Intentional: an interpolating estimator would report 9.55 here.
        let ten: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(value_at_risk(&ten, 0.95), Some(10.0));
        let twenty: Vec<f64> = (1..=20).map(f64::from).collect();
        assert_eq!(value_at_risk(&twenty, 0.95), Some(19.0));
        assert_eq!(conditional_value_at_risk(&twenty, 0.95), Some(19.5));
    }

    #[test]
    fn flat_fractional_tail_is_not_below_var() {
        // A naive sum / len gives 0.6999999999999998 here.
        let flat = [0.7, 0.7, 0.7];
        for c in [0.1, 0.5, 0.95, 1.0] {
            assert_eq!(value_at_risk(&flat, c), Some(0.7));
            assert_eq!(conditional_value_at_risk(&flat, c), Some(0.7));
        }
        let tenths = [0.1; 10];
        assert_eq!(conditional_value_at_risk(&tenths, 0.05), Some(0.1));
    }

    #[test]
    fn empty_losses_have_no_risk() {
        assert_eq!(value_at_risk(&[], 0.95), None);
        assert_eq!(conditional_value_at_risk(&[], 0.95), None);
        assert_eq!(TailRisk::from_losses(&[]), None);
        assert_eq!(analyze_risk(&[], 20.0), None);
        assert_eq!(analyze_inventory_risk(&[], 20.0), None);
        assert_eq!(analyze_profitability_risk(&[]), None);
    }

    #[test]
    fn never_breaking_even_is_certain_no_break_even() {
        let results = vec![trial(-500.0, 60, None), trial(-100.0, 30, None)];
        let report = analyze_profitability_risk(&results).expect("non-empty");
        assert_eq!(report.break_even_stats, None);
        assert_eq!(report.prob_no_break_even, 1.0);
        assert_eq!(report.prob_loss, 1.0);
        assert_eq!(report.prob_negative_roi, 1.0);
    }

    #[test]
    fn inventory_probabilities_and_exposure() {
        let results = vec![
            trial(2_000.0, 0, Some(4)),
            trial(-1_000.0, 30, None),
            trial(-3_000.0, 60, None),
            trial(500.0, 10, Some(9)),
        ];
        let report = analyze_inventory_risk(&results, 20.0).expect("non-empty");
        assert_relative_eq!(report.prob_sell_out, 0.25);
        assert_relative_eq!(report.prob_unsold_over_25_pct, 0.5);
        assert_relative_eq!(report.prob_unsold_over_50_pct, 0.25);
        // Exposure losses: [0, 1000, 3000, 0].
        assert_eq!(report.capital_exposure.var95, 3_000.0);
        assert_eq!(report.unsold_value.var99, 1_200.0);
        assert_relative_eq!(report.inventory_value_stats.mean, 500.0);

        let profit = analyze_profitability_risk(&results).expect("non-empty");
        assert_relative_eq!(profit.prob_loss, 0.5);
        assert_relative_eq!(profit.prob_no_break_even, 0.5);
        let be = profit.break_even_stats.expect("two trials break even");
        assert_eq!(be.n, 2);
        assert_relative_eq!(be.mean, 6.5);
        assert_eq!(profit.net_loss.var99, 3_000.0);
        assert_eq!(profit.roi_shortfall.var99, 0.3);
    }

    proptest! {
        #[test]
        fn cvar_never_below_var(
            losses in prop::collection::vec(-1e6f64..1e6, 1..200),
            c in 0.01f64..=1.0,
        ) {
            let var = value_at_risk(&losses, c).unwrap();
            let cvar = conditional_value_at_risk(&losses, c).unwrap();
            prop_assert!(cvar >= var, "CVaR {} < VaR {}", cvar, var);
        }

        #[test]
        fn full_confidence_var_is_max(losses in prop::collection::vec(-1e6f64..1e6, 1..200)) {
            let max = losses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert_eq!(value_at_risk(&losses, 1.0), Some(max));
        }

        #[test]
        fn single_loss_is_its_own_tail(x in -1e6f64..1e6, c in 0.01f64..=1.0) {
            prop_assert_eq!(value_at_risk(&[x], c), Some(x));
            prop_assert_eq!(conditional_value_at_risk(&[x], c), Some(x));
        }

        #[test]
        fn cvar_never_below_var_on_flat_tails(
            x in -1e6f64..1e6,
            n in 1usize..64,
            c in 0.01f64..=1.0,
        ) {
            let flat = vec![x; n];
            prop_assert_eq!(value_at_risk(&flat, c), Some(x));
            prop_assert!(conditional_value_at_risk(&flat, c).unwrap() >= x);
        }

        #[test]
        fn tail_metrics_ignore_order(
            losses in prop::collection::vec(-1e6f64..1e6, 1..100),
            shift in 0usize..100,
            c in 0.01f64..=1.0,
        ) {
            let var = value_at_risk(&losses, c);
            let cvar = conditional_value_at_risk(&losses, c);

            let mut rotated = losses.clone();
            rotated.rotate_left(shift % losses.len());
            let mut descending = losses.clone();
            descending.sort_by(|a, b| b.total_cmp(a));
            let mut interleaved: Vec<f64> = losses.iter().copied().step_by(2).collect();
            interleaved.extend(losses.iter().copied().skip(1).step_by(2));

            for permuted in [rotated, descending, interleaved] {
                prop_assert_eq!(value_at_risk(&permuted, c), var);
                prop_assert_eq!(conditional_value_at_risk(&permuted, c), cvar);
            }
        }

        #[test]
        fn var_monotone_in_confidence(
            losses in prop::collection::vec(-1e6f64..1e6, 1..100),
            a in 0.01f64..=1.0,
            b in 0.01f64..=1.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(value_at_risk(&losses, lo).unwrap() <= value_at_risk(&losses, hi).unwrap());
        }
    }
}
