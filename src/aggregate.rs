// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Distributional Aggregation
//
// Per-metric summaries over the raw trial array. Percentiles use the same
// nearest-rank rule as the risk engine's VaR.

use serde::{Deserialize, Serialize};

use crate::types::{TrialResult, WeeklyPoint};

// ─── Nearest Rank ───────────────────────────────────────────────────────────

/// `ceil(confidence × n) − 1`, clamped into `[0, n − 1]`.
///
/// Nearest-rank, not interpolated: results differ from most statistics
/// packages on small samples and must stay that way.
pub fn nearest_rank_index(n: usize, confidence: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let rank = (confidence * n as f64).ceil() - 1.0;
    if rank.is_nan() || rank < 0.0 {
        0
    } else {
        (rank as usize).min(n - 1)
    }
}

/// Ascending copy; NaN sorts last.
pub fn sorted(samples: &[f64]) -> Vec<f64> {
    let mut out = samples.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Nearest-rank percentile of an ascending, non-empty slice.
pub fn percentile_sorted(sorted: &[f64], confidence: f64) -> f64 {
    sorted[nearest_rank_index(sorted.len(), confidence)]
}

// ─── MetricStats ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub n: usize,
}

impl MetricStats {
    /// All-zero stats for an empty sample.
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self::default();
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        let s = sorted(samples);
        Self {
            mean,
            std: variance.sqrt(),
            min: s[0],
            max: s[n - 1],
            p5: percentile_sorted(&s, 0.05),
            p10: percentile_sorted(&s, 0.10),
            p25: percentile_sorted(&s, 0.25),
            p50: percentile_sorted(&s, 0.50),
            p75: percentile_sorted(&s, 0.75),
            p90: percentile_sorted(&s, 0.90),
            p95: percentile_sorted(&s, 0.95),
            n,
        }
    }

    /// `None` for an empty sample.
    pub fn non_empty(samples: &[f64]) -> Option<Self> {
        (!samples.is_empty()).then(|| Self::from_samples(samples))
    }
}

// ─── AggregateStatistics ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStatistics {
    pub units_sold: MetricStats,
    pub revenue: MetricStats,
    pub total_cost: MetricStats,
    pub gross_profit: MetricStats,
    pub net_profit: MetricStats,
    pub roi: MetricStats,
    pub margin_pct: MetricStats,
    pub remaining_inventory: MetricStats,
    pub remaining_inventory_value: MetricStats,
    pub unsold_pct: MetricStats,
    pub lost_sales: MetricStats,
    /// Over trials that break even; `None` when none do.
    pub break_even_week: Option<MetricStats>,
}

fn column(results: &[TrialResult], f: impl Fn(&TrialResult) -> f64) -> Vec<f64> {
    results.iter().map(f).collect()
}

pub fn summarize(results: &[TrialResult]) -> AggregateStatistics {
    let break_even: Vec<f64> = results
        .iter()
        .filter_map(|r| r.break_even_week.map(f64::from))
        .collect();

    AggregateStatistics {
        units_sold: MetricStats::from_samples(&column(results, |r| r.units_sold as f64)),
        revenue: MetricStats::from_samples(&column(results, |r| r.revenue)),
        total_cost: MetricStats::from_samples(&column(results, |r| r.total_cost)),
        gross_profit: MetricStats::from_samples(&column(results, |r| r.gross_profit)),
        net_profit: MetricStats::from_samples(&column(results, |r| r.net_profit)),
        roi: MetricStats::from_samples(&column(results, |r| r.roi)),
        margin_pct: MetricStats::from_samples(&column(results, |r| r.margin_pct)),
        remaining_inventory: MetricStats::from_samples(&column(results, |r| {
            r.remaining_inventory as f64
        })),
        remaining_inventory_value: MetricStats::from_samples(&column(results, |r| {
            r.remaining_inventory_value
        })),
        unsold_pct: MetricStats::from_samples(&column(results, |r| r.unsold_pct)),
        lost_sales: MetricStats::from_samples(&column(results, |r| r.lost_sales as f64)),
        break_even_week: MetricStats::non_empty(&break_even),
    }
}

/// Per-week mean across trials. Weeks a trial did not record are skipped.
pub fn weekly_averages(results: &[TrialResult], weeks: u32) -> Vec<WeeklyPoint> {
    (1..=weeks)
        .filter_map(|week| {
            let points: Vec<&WeeklyPoint> = results
                .iter()
                .filter_map(|r| r.weekly.get(week as usize - 1))
                .filter(|p| p.week == week)
                .collect();
            if points.is_empty() {
                return None;
            }
            let n = points.len() as f64;
            let mean = |f: fn(&WeeklyPoint) -> f64| points.iter().map(|p| f(p)).sum::<f64>() / n;
            Some(WeeklyPoint {
                week,
                units_sold: mean(|p| p.units_sold),
                revenue: mean(|p| p.revenue),
                cumulative_profit: mean(|p| p.cumulative_profit),
                inventory: mean(|p| p.inventory),
                market_share: mean(|p| p.market_share),
            })
        })
        .collect()
}
