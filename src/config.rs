// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Run Configuration
//
// Input contract for a run, its bounds, and typed overrides used by
// parameter sweeps.

use serde::{Deserialize, Serialize};

use crate::correlation::{CorrelationPreset, MAX_SHOCK_INTENSITY};
use crate::rng::Distribution;

// ─── Bounds ─────────────────────────────────────────────────────────────────

pub const MIN_ITERATIONS: u32 = 1;
pub const MAX_ITERATIONS: u32 = 10_000;
pub const MIN_WEEKS: u32 = 1;
pub const MAX_WEEKS: u32 = 104;
pub const MAX_SEED: u64 = (1 << 31) - 1;

/// Fraction of the offer's expected horizon demand stocked when no inventory
/// is given. At 1.0 a trial sells out only when demand runs above expectation.
pub const DEFAULT_STOCK_COVERAGE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Parse(String),
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: String, value: f64 },
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange { field: String, value: f64, min: f64, max: f64 },
    #[error("unit cost {cogs} must be positive and below base price {base_price}")]
    CostNotBelowPrice { cogs: f64, base_price: f64 },
    #[error("iterations {0} outside [1, 10000]")]
    Iterations(u32),
    #[error("weeks {0} outside [1, 104]")]
    Weeks(u32),
    #[error("seed {0} outside [0, 2147483647]")]
    Seed(u64),
    #[error("population must contain at least one customer")]
    EmptyPopulation,
    #[error("initial inventory must be at least one unit")]
    EmptyInventory,
    #[error("invalid {field} distribution: {reason}")]
    Distribution { field: String, reason: String },
}

fn check_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field: field.to_string(), value });
    }
    if value < min || value > max {
        return Err(ConfigError::OutOfRange { field: field.to_string(), value, min, max });
    }
    Ok(())
}

// ─── Offer & Population ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferTerms {
    pub base_price: f64,
    /// Unit cost of goods sold.
    pub cogs: f64,
    /// Total marketing spend over the horizon, spread evenly per week.
    pub marketing_budget: f64,
    /// Perceived quality in `[0, 1]`.
    pub quality_index: f64,
    /// Units bought up front. Derived from expected demand when absent.
    #[serde(default)]
    pub initial_inventory: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Population {
    pub total_customers: u64,
    /// Fraction of the population shopping the category in a given week.
    #[serde(default = "default_purchase_rate")]
    pub weekly_purchase_rate: f64,
}

fn default_purchase_rate() -> f64 {
    0.02
}

// ─── Market Model Descriptor ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorProfile {
    pub name: String,
    pub price: f64,
    pub quality_index: f64,
    #[serde(default)]
    pub marketing_budget: f64,
    /// Propensity to undercut, `[0, 1]`.
    #[serde(default = "default_aggression")]
    pub aggression: f64,
}

fn default_aggression() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShockSettings {
    pub preset: CorrelationPreset,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
}

fn default_intensity() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketModelDescriptor {
    pub competitors: Vec<CompetitorProfile>,
    /// Price elasticity of demand (negative).
    pub price_elasticity: f64,
    /// Std of the weekly log-normal market-size noise.
    pub demand_volatility: f64,
    /// Compound weekly market growth.
    pub weekly_growth: f64,
    /// Base per-week probability that supply halves the sellable stock.
    pub supply_disruption_probability: f64,
    /// Weekly realization of each competitor's aggression.
    pub competitor_response: Distribution,
    pub shocks: Option<ShockSettings>,
}

impl Default for MarketModelDescriptor {
    fn default() -> Self {
        Self {
            competitors: Vec::new(),
            price_elasticity: -1.5,
            demand_volatility: 0.15,
            weekly_growth: 0.0,
            supply_disruption_probability: 0.05,
            competitor_response: Distribution::Triangular { min: 0.5, mode: 1.0, max: 1.5 },
            shocks: None,
        }
    }
}

fn validate_distribution(field: &str, dist: &Distribution) -> Result<(), ConfigError> {
    let fail = |reason: &str| {
        Err(ConfigError::Distribution { field: field.to_string(), reason: reason.to_string() })
    };
    match *dist {
        Distribution::Normal { mean, std_dev } => {
            if !mean.is_finite() || !std_dev.is_finite() || std_dev < 0.0 {
                return fail("normal needs finite mean and non-negative std");
            }
        }
        Distribution::Uniform { min, max } => {
            if !min.is_finite() || !max.is_finite() || min > max {
                return fail("uniform needs finite min <= max");
            }
        }
        Distribution::Triangular { min, mode, max } => {
            if ![min, mode, max].iter().all(|v| v.is_finite()) || !(min <= mode && mode <= max) {
                return fail("triangular needs finite min <= mode <= max");
            }
        }
        Distribution::LogNormal { mean, std_dev } => {
            if !mean.is_finite() || !std_dev.is_finite() || mean <= 0.0 || std_dev < 0.0 {
                return fail("log-normal needs positive mean and non-negative std");
            }
        }
    }
    Ok(())
}

// ─── SimulationConfig ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub offer: OfferTerms,
    pub population: Population,
    #[serde(default)]
    pub market_model: MarketModelDescriptor,
    pub iterations: u32,
    pub weeks: u32,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_include_risk")]
    pub include_risk: bool,
}

fn default_include_risk() -> bool {
    true
}

impl SimulationConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects out-of-range input before any trial runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let offer = &self.offer;
        check_range("offer.basePrice", offer.base_price, 0.0, f64::MAX)?;
        check_range("offer.cogs", offer.cogs, 0.0, f64::MAX)?;
        if offer.cogs <= 0.0 || offer.cogs >= offer.base_price {
            return Err(ConfigError::CostNotBelowPrice {
                cogs: offer.cogs,
                base_price: offer.base_price,
            });
        }
        check_range("offer.marketingBudget", offer.marketing_budget, 0.0, f64::MAX)?;
        check_range("offer.qualityIndex", offer.quality_index, 0.0, 1.0)?;
        if offer.initial_inventory == Some(0) {
            return Err(ConfigError::EmptyInventory);
        }

        if self.population.total_customers == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        check_range("population.weeklyPurchaseRate", self.population.weekly_purchase_rate, 0.0, 1.0)?;

        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(ConfigError::Iterations(self.iterations));
        }
        if !(MIN_WEEKS..=MAX_WEEKS).contains(&self.weeks) {
            return Err(ConfigError::Weeks(self.weeks));
        }
        if let Some(seed) = self.seed {
            if seed > MAX_SEED {
                return Err(ConfigError::Seed(seed));
            }
        }

        let model = &self.market_model;
        check_range("marketModel.priceElasticity", model.price_elasticity, -10.0, 0.0)?;
        check_range("marketModel.demandVolatility", model.demand_volatility, 0.0, 2.0)?;
        check_range("marketModel.weeklyGrowth", model.weekly_growth, -0.5, 0.5)?;
        check_range(
            "marketModel.supplyDisruptionProbability",
            model.supply_disruption_probability,
            0.0,
            1.0,
        )?;
        validate_distribution("marketModel.competitorResponse", &model.competitor_response)?;
        for (i, c) in model.competitors.iter().enumerate() {
            let field = |name: &str| format!("marketModel.competitors[{i}].{name}");
            check_range(&field("price"), c.price, f64::MIN_POSITIVE, f64::MAX)?;
            check_range(&field("qualityIndex"), c.quality_index, 0.0, 1.0)?;
            check_range(&field("marketingBudget"), c.marketing_budget, 0.0, f64::MAX)?;
            check_range(&field("aggression"), c.aggression, 0.0, 1.0)?;
        }
        if let Some(shocks) = &model.shocks {
            check_range("marketModel.shocks.intensity", shocks.intensity, 0.0, MAX_SHOCK_INTENSITY)?;
        }
        Ok(())
    }

    /// Units bought up front; at least one. Without an explicit quantity the
    /// offer stocks `expected_demand` (units over the whole horizon, as
    /// estimated by the market model) times [`DEFAULT_STOCK_COVERAGE`].
    pub fn initial_inventory(&self, expected_demand: f64) -> u64 {
        self.offer.initial_inventory.unwrap_or_else(|| {
            let units = (expected_demand * DEFAULT_STOCK_COVERAGE).ceil();
            if units.is_finite() && units >= 1.0 {
                units as u64
            } else {
                1
            }
        })
    }

    /// Marketing spend booked each week.
    pub fn weekly_marketing(&self) -> f64 {
        self.offer.marketing_budget / self.weeks as f64
    }
}

// ─── Typed Overrides ────────────────────────────────────────────────────────

/// Optional per-field overrides applied on top of a base configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    pub base_price: Option<f64>,
    pub cogs: Option<f64>,
    pub marketing_budget: Option<f64>,
    pub quality_index: Option<f64>,
    pub initial_inventory: Option<u64>,
    pub total_customers: Option<u64>,
    pub price_elasticity: Option<f64>,
    pub demand_volatility: Option<f64>,
    pub shocks: Option<ShockSettings>,
    pub iterations: Option<u32>,
    pub weeks: Option<u32>,
    pub seed: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, base: &SimulationConfig) -> SimulationConfig {
        let mut config = base.clone();
        if let Some(v) = self.base_price {
            config.offer.base_price = v;
        }
        if let Some(v) = self.cogs {
            config.offer.cogs = v;
        }
        if let Some(v) = self.marketing_budget {
            config.offer.marketing_budget = v;
        }
        if let Some(v) = self.quality_index {
            config.offer.quality_index = v;
        }
        if let Some(v) = self.initial_inventory {
            config.offer.initial_inventory = Some(v);
        }
        if let Some(v) = self.total_customers {
            config.population.total_customers = v;
        }
        if let Some(v) = self.price_elasticity {
            config.market_model.price_elasticity = v;
        }
        if let Some(v) = self.demand_volatility {
            config.market_model.demand_volatility = v;
        }
        if let Some(v) = &self.shocks {
            config.market_model.shocks = Some(v.clone());
        }
        if let Some(v) = self.iterations {
            config.iterations = v;
        }
        if let Some(v) = self.weeks {
            config.weeks = v;
        }
        if let Some(v) = self.seed {
            config.seed = Some(v);
        }
        config
    }
}
