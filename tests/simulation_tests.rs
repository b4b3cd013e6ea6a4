#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use market_sim_engine::config::{
        CompetitorProfile, MarketModelDescriptor, OfferTerms, Population, ShockSettings,
    };
    use market_sim_engine::executor::{ExecutorError, ParallelExecutor};
    use market_sim_engine::market::{SimulationError, WeekContext, WeekOutcome};
    use market_sim_engine::rng::SeededRng;
    use market_sim_engine::*;

    fn launch_config() -> SimulationConfig {
        SimulationConfig {
            offer: OfferTerms {
                base_price: 40.0,
                cogs: 15.0,
                marketing_budget: 20_000.0,
                quality_index: 0.65,
                initial_inventory: None,
            },
            population: Population { total_customers: 80_000, weekly_purchase_rate: 0.03 },
            market_model: MarketModelDescriptor {
                competitors: vec![CompetitorProfile {
                    name: "incumbent".to_string(),
                    price: 38.0,
                    quality_index: 0.6,
                    marketing_budget: 15_000.0,
                    aggression: 0.6,
                }],
                ..MarketModelDescriptor::default()
            },
            iterations: 500,
            weeks: 16,
            seed: Some(42),
            include_risk: true,
        }
    }

    fn sequential_engine(units: usize) -> MonteCarloEngine {
        MonteCarloEngine::new(Box::new(SequentialExecutor::new(units)))
    }

    // ========== End-to-End ==========

    #[test]
    fn test_full_run_shape() {
        let config = launch_config();
        let result = sequential_engine(4).run(&config).expect("run succeeds");

        assert_eq!(result.raw_results.len(), 500);
        assert_eq!(result.iterations, 500);
        assert_eq!(result.weeks, 16);
        assert_eq!(result.weekly_averages.len(), 16);
        for (i, point) in result.weekly_averages.iter().enumerate() {
            assert_eq!(point.week as usize, i + 1);
        }
        for (i, trial) in result.raw_results.iter().enumerate() {
            assert_eq!(trial.trial as usize, i, "samples must be in iteration order");
            assert_eq!(trial.weekly.len(), 16);
            assert!(trial.units_sold <= trial.initial_inventory);
            assert!(trial.net_profit.is_finite());
        }

        let stats = &result.statistics;
        assert_eq!(stats.net_profit.n, 500);
        assert!(stats.net_profit.min <= stats.net_profit.p5);
        assert!(stats.net_profit.p5 <= stats.net_profit.p50);
        assert!(stats.net_profit.p50 <= stats.net_profit.p95);
        assert!(stats.net_profit.p95 <= stats.net_profit.max);

        let risk = result.risk.expect("risk requested");
        for p in [
            risk.inventory.prob_sell_out,
            risk.inventory.prob_unsold_over_25_pct,
            risk.inventory.prob_unsold_over_50_pct,
            risk.profitability.prob_loss,
            risk.profitability.prob_negative_roi,
            risk.profitability.prob_no_break_even,
        ] {
            assert!((0.0..=1.0).contains(&p), "probability out of range: {}", p);
        }
        assert!(risk.profitability.net_loss.cvar95 >= risk.profitability.net_loss.var95);
        assert!(risk.inventory.capital_exposure.var95 >= 0.0);
        assert!(risk.inventory.prob_sell_out < 1.0, "derived stock must not guarantee a sell-out");
        assert!(stats.net_profit.std > 0.0);
        assert!(stats.net_profit.min < stats.net_profit.max);
        assert_eq!(risk.inventory.unit_cost, 15.0);
    }

    #[test]
    fn test_aggregates_match_raw_samples() {
        let result = sequential_engine(2).run(&launch_config()).expect("run succeeds");
        let mean = result.raw_results.iter().map(|r| r.net_profit).sum::<f64>() / 500.0;
        assert_relative_eq!(result.statistics.net_profit.mean, mean, max_relative = 1e-12);

        let week_one = result.raw_results.iter().map(|r| r.weekly[0].revenue).sum::<f64>() / 500.0;
        assert_relative_eq!(result.weekly_averages[0].revenue, week_one, max_relative = 1e-12);
    }

    // ========== Reproducibility ==========

    #[test]
    fn test_same_seed_same_samples() {
        let config = launch_config();
        let a = sequential_engine(4).run(&config).expect("first run");
        let b = sequential_engine(4).run(&config).expect("second run");
        assert_eq!(a.raw_results, b.raw_results);
    }

    #[test]
    fn test_different_seed_different_samples() {
        let mut config = launch_config();
        let a = sequential_engine(4).run(&config).expect("first run");
        config.seed = Some(43);
        let b = sequential_engine(4).run(&config).expect("second run");
        assert_ne!(a.raw_results, b.raw_results);
    }

    #[test]
    fn test_parallel_matches_sequential_seed_42() {
        let config = launch_config();
        let pool = ParallelExecutor::init(4).expect("pool starts");
        let parallel = MonteCarloEngine::new(Box::new(pool));
        let a = parallel.run(&config).expect("parallel run");
        let b = sequential_engine(4).run(&config).expect("sequential run");

        assert_eq!(a.executor, "parallel");
        assert!(a.statistics.net_profit.std > 0.0, "samples must not be constant");
        assert_relative_eq!(
            a.statistics.net_profit.mean,
            b.statistics.net_profit.mean,
            max_relative = 1e-9
        );
        assert_eq!(a.raw_results, b.raw_results);
        parallel.destroy();
    }

    #[test]
    fn test_pool_survives_many_runs() {
        let pool = ParallelExecutor::init(3).expect("pool starts");
        let engine = MonteCarloEngine::new(Box::new(pool));
        let mut config = launch_config();
        config.iterations = 60;
        for seed in 1..=5 {
            config.seed = Some(seed);
            let result = engine.run(&config).expect("run succeeds");
            assert_eq!(result.executor, "parallel");
            assert_eq!(result.raw_results.len(), 60);
        }
        engine.destroy();
        let after = engine.run(&config).expect("falls back after destroy");
        assert_eq!(after.executor, "sequential");
    }

    // ========== Inventory ==========

    #[test]
    fn test_stock_changes_sales_not_demand() {
        // Inventory never feeds back into the draws, so total demand per
        // trial is the same and sales can only grow with stock.
        let mut small = launch_config();
        small.offer.initial_inventory = Some(500);
        let mut large = launch_config();
        large.offer.initial_inventory = Some(50_000);

        let a = sequential_engine(4).run(&small).expect("small run");
        let b = sequential_engine(4).run(&large).expect("large run");
        for (s, l) in a.raw_results.iter().zip(&b.raw_results) {
            assert_eq!(s.units_sold + s.lost_sales, l.units_sold + l.lost_sales);
            assert!(s.units_sold <= l.units_sold);
        }
    }

    #[test]
    fn test_derived_inventory() {
        let config = launch_config();
        let expected = CompetitiveMarketModel.expected_demand(&config);
        let stock = config.initial_inventory(expected);
        // Sized to the offer's share, not the whole category.
        let category = 80_000.0 * 0.03 * 16.0;
        assert!((stock as f64) < category / 2.0, "stock {} of category {}", stock, category);
        assert_eq!(stock, expected.ceil() as u64);

        let result = sequential_engine(1).run(&config).expect("run succeeds");
        assert!(result.raw_results.iter().all(|r| r.initial_inventory == stock));
        let sold_out = result.raw_results.iter().filter(|r| r.remaining_inventory == 0).count();
        assert!(sold_out < result.raw_results.len(), "every trial sold out");
    }

    // ========== Shocks ==========

    #[test]
    fn test_shocked_run_records_every_trial() {
        let mut config = launch_config();
        config.market_model.shocks =
            Some(ShockSettings { preset: CorrelationPreset::SupplyShock, intensity: 3.0 });
        let result = sequential_engine(4).run(&config).expect("run succeeds");
        assert!(result.raw_results.iter().all(|r| r.shocks.is_some()));

        let plain = sequential_engine(4).run(&launch_config()).expect("run succeeds");
        assert!(plain.raw_results.iter().all(|r| r.shocks.is_none()));
    }

    #[test]
    fn test_every_preset_runs() {
        for preset in CorrelationPreset::ALL {
            let mut config = launch_config();
            config.iterations = 40;
            config.market_model.shocks = Some(ShockSettings { preset, intensity: 5.0 });
            let result = sequential_engine(2).run(&config);
            assert!(result.is_ok(), "{} failed: {:?}", preset, result.err());
        }
    }

    // ========== Rejections ==========

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = launch_config();
        config.weeks = 0;
        let err = sequential_engine(1).run(&config).expect_err("must reject");
        assert_eq!(err, EngineError::Config(ConfigError::Weeks(0)));

        let mut config = launch_config();
        config.offer.cogs = 45.0;
        assert!(matches!(
            sequential_engine(1).run(&config),
            Err(EngineError::Config(ConfigError::CostNotBelowPrice { .. }))
        ));
    }

    struct Diverges;

    impl MarketModel for Diverges {
        fn simulate_week(
            &self,
            ctx: &WeekContext<'_>,
            _scenario: &MarketScenario,
            _rng: &mut SeededRng,
        ) -> Result<WeekOutcome, SimulationError> {
            if ctx.week < 4 {
                return Ok(WeekOutcome {
                    demand: 0,
                    units_sold: 0,
                    lost_sales: 0,
                    revenue: 0.0,
                    market_share: 0.0,
                    supply_disrupted: false,
                });
            }
            Err(SimulationError::UnstableState { week: ctx.week, quantity: "demand", value: f64::INFINITY })
        }
    }

    #[test]
    fn test_model_failure_rejects_whole_run() {
        let config = launch_config();
        let err = sequential_engine(4)
            .run_with_model(&config, &Diverges)
            .expect_err("must reject");
        assert!(matches!(err, EngineError::Simulation(SimulationError::UnstableState { week: 4, .. })));
    }

    #[test]
    fn test_zero_unit_pool_refused() {
        assert!(matches!(ParallelExecutor::init(0), Err(ExecutorError::Startup { units: 0, .. })));
    }

    // ========== JSON ==========

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "offer": { "basePrice": 40, "cogs": 15, "marketingBudget": 20000, "qualityIndex": 0.65 },
            "population": { "totalCustomers": 80000 },
            "marketModel": {
                "competitors": [{ "name": "incumbent", "price": 38, "qualityIndex": 0.6 }],
                "competitorResponse": { "type": "triangular", "min": 0.8, "mode": 1.0, "max": 1.2 },
                "shocks": { "preset": "price_war", "intensity": 2 }
            },
            "iterations": 100,
            "weeks": 8
        }"#;
        let config = SimulationConfig::from_json(json).expect("valid config");
        assert_eq!(config.seed, None);
        assert!(config.include_risk);
        assert_eq!(config.population.weekly_purchase_rate, 0.02);
        assert_eq!(config.market_model.price_elasticity, -1.5);
        assert_eq!(config.market_model.competitors[0].aggression, 0.5);
        assert_eq!(
            config.market_model.shocks.as_ref().map(|s| s.preset),
            Some(CorrelationPreset::PriceWar)
        );

        let result = sequential_engine(2).run(&config).expect("run succeeds");
        assert_eq!(result.seed, DEFAULT_SEED);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(SimulationConfig::from_json("{ nope"), Err(ConfigError::Parse(_))));
        let out_of_range = r#"{
            "offer": { "basePrice": 40, "cogs": 15, "marketingBudget": 0, "qualityIndex": 0.5 },
            "population": { "totalCustomers": 1000 },
            "iterations": 20000,
            "weeks": 8
        }"#;
        assert_eq!(
            SimulationConfig::from_json(out_of_range),
            Err(ConfigError::Iterations(20_000))
        );
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut config = launch_config();
        config.iterations = 20;
        let result = sequential_engine(2).run(&config).expect("run succeeds");
        let value = serde_json::to_value(&result).expect("serializes");

        for key in ["rawResults", "weeklyAverages", "netProfit", "breakEvenWeek", "risk", "seed"] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
        let first = &value["rawResults"][0];
        assert!(first.get("remainingInventoryValue").is_some());
        assert!(first.get("breakEvenWeek").is_some());
        assert!(value["risk"]["profitability"].get("probNoBreakEven").is_some());
        assert!(value["netProfit"].get("p95").is_some());
    }

    #[test]
    fn test_overrides_apply_typed_fields() {
        let base = launch_config();
        let overrides = ConfigOverrides {
            base_price: Some(55.0),
            iterations: Some(10),
            shocks: Some(ShockSettings { preset: CorrelationPreset::Growth, intensity: 1.0 }),
            ..Default::default()
        };
        let config = overrides.apply(&base);
        assert_eq!(config.offer.base_price, 55.0);
        assert_eq!(config.iterations, 10);
        assert_eq!(config.offer.cogs, base.offer.cogs);
        assert!(config.market_model.shocks.is_some());
        assert_eq!(base.offer.base_price, 40.0, "base must be untouched");
    }
}
