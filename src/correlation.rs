// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Correlation Model
//
// Cholesky factorization of named correlation regimes and the mapping from a
// correlated normal draw to multiplicative scenario shocks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::rng::SeededRng;

/// A unit correlated draw at intensity 1 maps to a ±10% perturbation.
pub const SHOCK_SCALE: f64 = 0.1;

/// Upper bound accepted for shock intensity.
pub const MAX_SHOCK_INTENSITY: f64 = 5.0;

const SYMMETRY_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorrelationError {
    #[error("correlation matrix is empty")]
    Empty,
    #[error("correlation matrix is not square: row {row} has {len} entries, expected {expected}")]
    NotSquare { row: usize, len: usize, expected: usize },
    #[error("correlation matrix is not symmetric at ({i}, {j})")]
    NotSymmetric { i: usize, j: usize },
    #[error("correlation matrix diagonal at {index} is {value}, expected 1")]
    NonUnitDiagonal { index: usize, value: f64 },
    #[error("unknown correlation preset: {0}")]
    UnknownPreset(String),
}

// ---------------------------------------------------------------------------
// Risk factors
// ---------------------------------------------------------------------------

/// Named risk factors, in matrix order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    Demand = 0,
    PriceElasticity = 1,
    CompetitorAggression = 2,
    SupplyRisk = 3,
}

// ---------------------------------------------------------------------------
// CorrelationMatrix
// ---------------------------------------------------------------------------

/// Symmetric, unit-diagonal matrix. Positive-definiteness is not checked;
/// [`cholesky`] degrades gracefully instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    rows: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self, CorrelationError> {
        let n = rows.len();
        if n == 0 {
            return Err(CorrelationError::Empty);
        }
        for (row, values) in rows.iter().enumerate() {
            if values.len() != n {
                return Err(CorrelationError::NotSquare { row, len: values.len(), expected: n });
            }
        }
        for i in 0..n {
            if (rows[i][i] - 1.0).abs() > SYMMETRY_TOLERANCE {
                return Err(CorrelationError::NonUnitDiagonal { index: i, value: rows[i][i] });
            }
            for j in (i + 1)..n {
                if (rows[i][j] - rows[j][i]).abs() > SYMMETRY_TOLERANCE {
                    return Err(CorrelationError::NotSymmetric { i, j });
                }
            }
        }
        Ok(Self { rows })
    }

    pub fn identity(n: usize) -> Self {
        let rows = (0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self { rows }
    }

    pub fn dim(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.rows[i][j]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

// ---------------------------------------------------------------------------
// Cholesky
// ---------------------------------------------------------------------------

/// Lower-triangular factor `L` with `A ≈ L·Lᵀ`.
#[derive(Debug, Clone, PartialEq)]
pub struct CholeskyFactor {
    lower: Vec<Vec<f64>>,
    /// Pivots whose residual went negative and were clamped to zero.
    pub clamped_pivots: usize,
}

impl CholeskyFactor {
    pub fn lower(&self) -> &[Vec<f64>] {
        &self.lower
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// `L · z` for a vector of independent standard normals `z`.
    pub fn transform(&self, z: &[f64]) -> Vec<f64> {
        self.lower
            .iter()
            .map(|row| row.iter().zip(z).map(|(l, x)| l * x).sum())
            .collect()
    }

    /// Draws `n` independent normals and correlates them. O(n²).
    pub fn sample(&self, rng: &mut SeededRng) -> Vec<f64> {
        let z: Vec<f64> = (0..self.dim()).map(|_| rng.standard_normal()).collect();
        self.transform(&z)
    }
}

/// Column-by-column Cholesky factorization.
///
/// Negative diagonal residuals (numerical error or a non-PSD input) are
/// clamped to zero rather than rejected; an off-diagonal entry under a zero
/// pivot contributes 0 instead of NaN.
pub fn cholesky(matrix: &CorrelationMatrix) -> CholeskyFactor {
    let n = matrix.dim();
    let mut lower = vec![vec![0.0; n]; n];
    let mut clamped_pivots = 0;

    for j in 0..n {
        let sum_sq: f64 = lower[j][..j].iter().map(|v| v * v).sum();
        let residual = matrix.get(j, j) - sum_sq;
        if residual < 0.0 {
            clamped_pivots += 1;
            warn!(pivot = j, residual, "cholesky residual negative, clamping to zero");
        }
        lower[j][j] = residual.max(0.0).sqrt();

        for i in (j + 1)..n {
            let dot: f64 = (0..j).map(|k| lower[i][k] * lower[j][k]).sum();
            lower[i][j] = if lower[j][j] == 0.0 {
                0.0
            } else {
                (matrix.get(i, j) - dot) / lower[j][j]
            };
        }
    }

    CholeskyFactor { lower, clamped_pivots }
}

/// Correlated standard normals with the covariance structure of `matrix`.
pub fn correlated_normals(matrix: &CorrelationMatrix, rng: &mut SeededRng) -> Vec<f64> {
    cholesky(matrix).sample(rng)
}

// ---------------------------------------------------------------------------
// Preset catalog
// ---------------------------------------------------------------------------

/// Closed catalog of correlation regimes over
/// `{demand, price_elasticity, competitor_aggression, supply_risk}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationPreset {
    Independent,
    Recession,
    Growth,
    PriceWar,
    SupplyShock,
}

impl CorrelationPreset {
    pub const ALL: [CorrelationPreset; 5] = [
        Self::Independent,
        Self::Recession,
        Self::Growth,
        Self::PriceWar,
        Self::SupplyShock,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Independent => "independent",
            Self::Recession => "recession",
            Self::Growth => "growth",
            Self::PriceWar => "price_war",
            Self::SupplyShock => "supply_shock",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Independent => "Independent factors",
            Self::Recession => "Recession: demand falls, buyers turn price-sensitive",
            Self::Growth => "Growth: demand rises, competitors and suppliers strain",
            Self::PriceWar => "Price war: aggression and elasticity move together",
            Self::SupplyShock => "Supply shock: disruptions choke demand",
        }
    }

    fn entries(&self) -> [[f64; 4]; 4] {
        match self {
            Self::Independent => [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
            Self::Recession => [
                [1.0, -0.6, -0.4, 0.3],
                [-0.6, 1.0, 0.5, 0.1],
                [-0.4, 0.5, 1.0, 0.2],
                [0.3, 0.1, 0.2, 1.0],
            ],
            Self::Growth => [
                [1.0, -0.3, 0.5, 0.4],
                [-0.3, 1.0, 0.2, 0.0],
                [0.5, 0.2, 1.0, 0.3],
                [0.4, 0.0, 0.3, 1.0],
            ],
            Self::PriceWar => [
                [1.0, 0.3, -0.4, 0.0],
                [0.3, 1.0, 0.7, 0.1],
                [-0.4, 0.7, 1.0, 0.1],
                [0.0, 0.1, 0.1, 1.0],
            ],
            Self::SupplyShock => [
                [1.0, -0.2, 0.1, -0.5],
                [-0.2, 1.0, 0.1, 0.3],
                [0.1, 0.1, 1.0, -0.2],
                [-0.5, 0.3, -0.2, 1.0],
            ],
        }
    }

    pub fn matrix(&self) -> CorrelationMatrix {
        CorrelationMatrix {
            rows: self.entries().iter().map(|row| row.to_vec()).collect(),
        }
    }
}

impl fmt::Display for CorrelationPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CorrelationPreset {
    type Err = CorrelationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| CorrelationError::UnknownPreset(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Shocks
// ---------------------------------------------------------------------------

/// Scenario multipliers that correlated shocks act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketScenario {
    pub demand_multiplier: f64,
    pub price_elasticity_multiplier: f64,
    pub competitor_aggression_multiplier: f64,
    pub supply_risk_multiplier: f64,
    pub applied_shocks: Option<ShockRecord>,
}

impl Default for MarketScenario {
    fn default() -> Self {
        Self {
            demand_multiplier: 1.0,
            price_elasticity_multiplier: 1.0,
            competitor_aggression_multiplier: 1.0,
            supply_risk_multiplier: 1.0,
            applied_shocks: None,
        }
    }
}

/// The raw adjustments applied to a scenario, kept for auditability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockRecord {
    pub preset: CorrelationPreset,
    pub intensity: f64,
    pub demand: f64,
    pub price_elasticity: f64,
    pub competitor_aggression: f64,
    pub supply_risk: f64,
}

/// Preset plus its cached factor, reused across every trial of a run.
#[derive(Debug, Clone)]
pub struct ShockGenerator {
    preset: CorrelationPreset,
    intensity: f64,
    factor: CholeskyFactor,
}

impl ShockGenerator {
    pub fn new(preset: CorrelationPreset, intensity: f64) -> Self {
        let factor = cholesky(&preset.matrix());
        if factor.clamped_pivots > 0 {
            warn!(%preset, clamped = factor.clamped_pivots, "degenerate correlation preset");
        }
        debug!(%preset, intensity, "shock generator ready");
        Self { preset, intensity, factor }
    }

    pub fn apply(&self, scenario: &mut MarketScenario, rng: &mut SeededRng) {
        let draw = self.factor.sample(rng);
        let adj: Vec<f64> = draw.iter().map(|d| d * self.intensity * SHOCK_SCALE).collect();
        let at = |factor: RiskFactor| adj[factor as usize];

        scenario.demand_multiplier =
            (scenario.demand_multiplier * (1.0 + at(RiskFactor::Demand))).max(0.0);
        scenario.price_elasticity_multiplier =
            (scenario.price_elasticity_multiplier * (1.0 + at(RiskFactor::PriceElasticity))).max(0.0);
        scenario.competitor_aggression_multiplier = (scenario.competitor_aggression_multiplier
            * (1.0 + at(RiskFactor::CompetitorAggression)))
        .max(0.0);
        scenario.supply_risk_multiplier =
            (scenario.supply_risk_multiplier * (1.0 + at(RiskFactor::SupplyRisk))).max(0.0);

        scenario.applied_shocks = Some(ShockRecord {
            preset: self.preset,
            intensity: self.intensity,
            demand: at(RiskFactor::Demand),
            price_elasticity: at(RiskFactor::PriceElasticity),
            competitor_aggression: at(RiskFactor::CompetitorAggression),
            supply_risk: at(RiskFactor::SupplyRisk),
        });
    }
}

/// One-shot form of [`ShockGenerator::apply`].
pub fn apply_correlated_shocks(
    scenario: &mut MarketScenario,
    preset: CorrelationPreset,
    rng: &mut SeededRng,
    intensity: f64,
) {
    ShockGenerator::new(preset, intensity).apply(scenario, rng);
}
