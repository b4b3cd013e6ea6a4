// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Weekly Market Model
//
// One week of competitive demand: market size, logit share against
// competitors and an outside option, then a supply check. The trial runner
// treats this as a black box behind the `MarketModel` trait.

use serde::{Deserialize, Serialize};

use crate::config::{
    CompetitorProfile, MarketModelDescriptor, OfferTerms, Population, SimulationConfig,
};
use crate::correlation::MarketScenario;
use crate::rng::SeededRng;

// ─── Model Constants ────────────────────────────────────────────────────────

/// Attraction of not buying from anyone in the model.
pub const OUTSIDE_OPTION_ATTRACTION: f64 = 0.5;
/// Lift from marketing: `1 + LIFT × ln(1 + weekly_spend / REFERENCE)`.
pub const MARKETING_LIFT: f64 = 0.15;
pub const MARKETING_REFERENCE_SPEND: f64 = 1_000.0;
/// Largest price cut a fully aggressive competitor makes in one week.
pub const MAX_COMPETITOR_PRICE_CUT: f64 = 0.2;
/// A disrupted week can only sell this fraction of stock on hand.
pub const DISRUPTED_STOCK_FRACTION: f64 = 0.5;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A trial step reached a state the model cannot continue from.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("week {week}: {quantity} became non-finite ({value})")]
    UnstableState { week: u32, quantity: &'static str, value: f64 },
}

fn finite(week: u32, quantity: &'static str, value: f64) -> Result<f64, SimulationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimulationError::UnstableState { week, quantity, value })
    }
}

// ─── Model Interface ────────────────────────────────────────────────────────

/// Inputs that stay fixed for one week of one trial.
#[derive(Debug, Clone, Copy)]
pub struct WeekContext<'a> {
    /// 1-based week number.
    pub week: u32,
    pub horizon_weeks: u32,
    pub offer: &'a OfferTerms,
    pub population: &'a Population,
    pub descriptor: &'a MarketModelDescriptor,
    pub inventory_on_hand: u64,
    pub weekly_marketing: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekOutcome {
    pub demand: u64,
    pub units_sold: u64,
    pub lost_sales: u64,
    pub revenue: f64,
    pub market_share: f64,
    pub supply_disrupted: bool,
}

/// Per-week market simulator. Implementations must be pure with respect to
/// `self`; all randomness comes from the supplied stream.
pub trait MarketModel: Send + Sync {
    fn simulate_week(
        &self,
        ctx: &WeekContext<'_>,
        scenario: &MarketScenario,
        rng: &mut SeededRng,
    ) -> Result<WeekOutcome, SimulationError>;

    /// Units the offer expects to sell over the whole horizon with unlimited
    /// stock. Sizes derived inventory; defaults to the whole category.
    fn expected_demand(&self, config: &SimulationConfig) -> f64 {
        let population = &config.population;
        population.total_customers as f64 * population.weekly_purchase_rate * f64::from(config.weeks)
    }
}

// ─── CompetitiveMarketModel ─────────────────────────────────────────────────

/// Default model: log-normal market size, multinomial-logit style share.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompetitiveMarketModel;

fn marketing_factor(weekly_spend: f64) -> f64 {
    1.0 + MARKETING_LIFT * (1.0 + weekly_spend.max(0.0) / MARKETING_REFERENCE_SPEND).ln()
}

fn attraction(price: f64, reference_price: f64, quality: f64, marketing: f64, elasticity: f64) -> f64 {
    (price / reference_price).powf(elasticity) * (0.5 + quality) * marketing_factor(marketing)
}

fn reference_price(offer: &OfferTerms, competitors: &[CompetitorProfile]) -> f64 {
    if competitors.is_empty() {
        offer.base_price
    } else {
        competitors.iter().map(|c| c.price).sum::<f64>() / competitors.len() as f64
    }
}

/// Offer share against every competitor and the outside option. `response`
/// yields one realized competitor response per competitor, in order.
fn offer_share(
    offer: &OfferTerms,
    model: &MarketModelDescriptor,
    weekly_marketing: f64,
    horizon: f64,
    elasticity: f64,
    aggression_multiplier: f64,
    mut response: impl FnMut() -> f64,
) -> f64 {
    let reference = reference_price(offer, &model.competitors);
    let ours = attraction(offer.base_price, reference, offer.quality_index, weekly_marketing, elasticity);
    let rivals: f64 = model
        .competitors
        .iter()
        .map(|c| {
            let cut = (c.aggression * response().max(0.0) * aggression_multiplier
                * MAX_COMPETITOR_PRICE_CUT)
                .min(0.95);
            let price = c.price * (1.0 - cut);
            attraction(price, reference, c.quality_index, c.marketing_budget / horizon, elasticity)
        })
        .sum();
    ours / (ours + rivals + OUTSIDE_OPTION_ATTRACTION)
}

impl MarketModel for CompetitiveMarketModel {
    /// Share at the mean competitor response times the grown category size.
    fn expected_demand(&self, config: &SimulationConfig) -> f64 {
        let model = &config.market_model;
        let mean_response = model.competitor_response.mean();
        let share = offer_share(
            &config.offer,
            model,
            config.weekly_marketing(),
            f64::from(config.weeks.max(1)),
            model.price_elasticity,
            1.0,
            || mean_response,
        );
        let weekly = config.population.total_customers as f64 * config.population.weekly_purchase_rate;
        let category: f64 = (1..=config.weeks)
            .map(|w| weekly * (1.0 + model.weekly_growth).powi(w as i32 - 1))
            .sum();
        category * share
    }

    fn simulate_week(
        &self,
        ctx: &WeekContext<'_>,
        scenario: &MarketScenario,
        rng: &mut SeededRng,
    ) -> Result<WeekOutcome, SimulationError> {
        let week = ctx.week;
        let model = ctx.descriptor;

        // Market size
        let growth = (1.0 + model.weekly_growth).powi(week as i32 - 1);
        let noise = if model.demand_volatility > 0.0 {
            rng.log_normal(1.0, model.demand_volatility)
        } else {
            1.0
        };
        let market_size = finite(
            week,
            "market size",
            ctx.population.total_customers as f64
                * ctx.population.weekly_purchase_rate
                * growth
                * scenario.demand_multiplier
                * noise,
        )?;

        // Share
        let elasticity = model.price_elasticity * scenario.price_elasticity_multiplier;
        let share = finite(
            week,
            "market share",
            offer_share(
                ctx.offer,
                model,
                ctx.weekly_marketing,
                f64::from(ctx.horizon_weeks.max(1)),
                elasticity,
                scenario.competitor_aggression_multiplier,
                || model.competitor_response.sample(rng),
            ),
        )?;

        // Demand with count noise around the expectation
        let expected = market_size * share;
        let realized = finite(week, "demand", rng.normal(expected, expected.sqrt()))?;
        let demand = realized.round().max(0.0) as u64;

        // Supply
        let disruption_p =
            (model.supply_disruption_probability * scenario.supply_risk_multiplier).clamp(0.0, 1.0);
        let supply_disrupted = rng.next_uniform() < disruption_p;
        let sellable = if supply_disrupted {
            (ctx.inventory_on_hand as f64 * DISRUPTED_STOCK_FRACTION).floor() as u64
        } else {
            ctx.inventory_on_hand
        };

        let units_sold = demand.min(sellable);
        let revenue = finite(week, "revenue", units_sold as f64 * ctx.offer.base_price)?;

        Ok(WeekOutcome {
            demand,
            units_sold,
            lost_sales: demand - units_sold,
            revenue,
            market_share: share,
            supply_disrupted,
        })
    }
}
