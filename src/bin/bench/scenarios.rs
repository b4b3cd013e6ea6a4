// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Bench Scenario Sweeps
//
// Every scenario is a set of typed overrides on one base launch.

use market_sim_engine::config::{
    CompetitorProfile, MarketModelDescriptor, OfferTerms, Population, ShockSettings,
};
use market_sim_engine::{ConfigOverrides, CorrelationPreset, SimulationConfig};

pub struct Scenario {
    pub name: &'static str,
    pub label: &'static str,
    pub category: &'static str,
    pub overrides: ConfigOverrides,
}

/// Mid-market launch against two incumbents.
pub fn base_config(iterations: u32, seed: u64) -> SimulationConfig {
    SimulationConfig {
        offer: OfferTerms {
            base_price: 49.0,
            cogs: 18.0,
            marketing_budget: 25_000.0,
            quality_index: 0.7,
            initial_inventory: None,
        },
        population: Population { total_customers: 120_000, weekly_purchase_rate: 0.02 },
        market_model: MarketModelDescriptor {
            competitors: vec![
                CompetitorProfile {
                    name: "value-leader".to_string(),
                    price: 39.0,
                    quality_index: 0.5,
                    marketing_budget: 15_000.0,
                    aggression: 0.7,
                },
                CompetitorProfile {
                    name: "premium".to_string(),
                    price: 69.0,
                    quality_index: 0.85,
                    marketing_budget: 30_000.0,
                    aggression: 0.3,
                },
            ],
            ..MarketModelDescriptor::default()
        },
        iterations,
        weeks: 26,
        seed: Some(seed),
        include_risk: true,
    }
}

fn shocks(preset: CorrelationPreset, intensity: f64) -> Option<ShockSettings> {
    Some(ShockSettings { preset, intensity })
}

pub fn scenarios() -> Vec<Scenario> {
    let mut out = vec![Scenario {
        name: "BASELINE",
        label: "Baseline launch",
        category: "baseline",
        overrides: ConfigOverrides::default(),
    }];

    // ─── Pricing ────────────────────────────────────────────────────────

    for (name, label, price) in [
        ("PRICE_39", "Price matched to value leader", 39.0),
        ("PRICE_59", "Premium price point", 59.0),
    ] {
        out.push(Scenario {
            name,
            label,
            category: "pricing",
            overrides: ConfigOverrides { base_price: Some(price), ..Default::default() },
        });
    }

    // ─── Marketing and stock ────────────────────────────────────────────

    out.push(Scenario {
        name: "MARKETING_HEAVY",
        label: "Doubled marketing budget",
        category: "marketing",
        overrides: ConfigOverrides { marketing_budget: Some(50_000.0), ..Default::default() },
    });
    out.push(Scenario {
        name: "OVERSTOCK",
        label: "Stock sized to the whole category",
        category: "inventory",
        overrides: ConfigOverrides { initial_inventory: Some(60_000), ..Default::default() },
    });
    out.push(Scenario {
        name: "VOLATILE_DEMAND",
        label: "High demand volatility",
        category: "market",
        overrides: ConfigOverrides {
            demand_volatility: Some(0.45),
            price_elasticity: Some(-2.5),
            ..Default::default()
        },
    });

    // ─── Correlated shocks ──────────────────────────────────────────────

    for preset in CorrelationPreset::ALL {
        out.push(Scenario {
            name: preset.name(),
            label: preset.label(),
            category: "shocks",
            overrides: ConfigOverrides { shocks: shocks(preset, 2.0), ..Default::default() },
        });
    }

    out
}
