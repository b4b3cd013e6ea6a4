// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Monte Carlo Engine
//
// Validates a configuration, distributes its trials over the injected
// executor, then aggregates and analyzes the raw samples. The engine keeps
// no state between runs beyond the executor itself.

use std::sync::OnceLock;

use tracing::{debug, info, warn};

use crate::aggregate::{summarize, weekly_averages};
use crate::config::SimulationConfig;
use crate::error::EngineError;
use crate::executor::{default_units, select_executor, SequentialExecutor, TrialExecutor};
use crate::market::{CompetitiveMarketModel, MarketModel};
use crate::risk::analyze_risk;
use crate::trial::TrialRunner;
use crate::types::{SimulationResult, TrialResult};

/// Seed used when the configuration does not carry one.
pub const DEFAULT_SEED: u64 = 42;

static SHARED_ENGINE: OnceLock<MonteCarloEngine> = OnceLock::new();

pub struct MonteCarloEngine {
    executor: Box<dyn TrialExecutor>,
}

impl MonteCarloEngine {
    pub fn new(executor: Box<dyn TrialExecutor>) -> Self {
        Self { executor }
    }

    /// Parallel executor sized to the host, sequential where unavailable.
    pub fn with_default_executor() -> Self {
        Self::new(select_executor(default_units()))
    }

    /// Process-wide engine for host entry points. Its executor is selected
    /// on first use and reused by every later call.
    pub fn shared() -> &'static MonteCarloEngine {
        SHARED_ENGINE.get_or_init(Self::with_default_executor)
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    /// Runs `config` against the built-in competitive market model.
    pub fn run(&self, config: &SimulationConfig) -> Result<SimulationResult, EngineError> {
        self.run_with_model(config, &CompetitiveMarketModel)
    }

    pub fn run_with_model(
        &self,
        config: &SimulationConfig,
        model: &dyn MarketModel,
    ) -> Result<SimulationResult, EngineError> {
        config.validate()?;
        let seed = config.seed.unwrap_or(DEFAULT_SEED);
        let runner = TrialRunner::new(config, model);

        info!(
            iterations = config.iterations,
            weeks = config.weeks,
            seed,
            executor = self.executor.name(),
            "simulation started"
        );

        let (raw_results, executor) = self.distribute(&runner, config.iterations, seed)?;
        let expected = config.iterations as usize;
        if raw_results.len() != expected {
            return Err(EngineError::Truncated { expected, actual: raw_results.len() });
        }

        let statistics = summarize(&raw_results);
        let weekly = weekly_averages(&raw_results, config.weeks);
        let risk = if config.include_risk {
            analyze_risk(&raw_results, config.offer.cogs)
        } else {
            None
        };
        debug!(
            mean_net_profit = statistics.net_profit.mean,
            risk = risk.is_some(),
            "aggregation complete"
        );

        info!(
            trials = raw_results.len(),
            executor,
            mean_net_profit = statistics.net_profit.mean,
            "simulation finished"
        );

        Ok(SimulationResult {
            statistics,
            raw_results,
            weekly_averages: weekly,
            risk,
            seed,
            iterations: config.iterations,
            weeks: config.weeks,
            executor: executor.to_string(),
        })
    }

    /// Releases the executor's units. Later runs fall back to sequential.
    pub fn destroy(&self) {
        self.executor.destroy();
    }

    // Executor failures are retried once on the calling thread with the same
    // plan; model failures are not.
    fn distribute(
        &self,
        runner: &TrialRunner<'_>,
        total: u32,
        seed: u64,
    ) -> Result<(Vec<TrialResult>, &'static str), EngineError> {
        match self.executor.distribute(runner, total, seed) {
            Ok(results) => Ok((results, self.executor.name())),
            Err(EngineError::Executor(err)) => {
                warn!(
                    error = %err,
                    executor = self.executor.name(),
                    "executor failed, retrying sequentially"
                );
                let fallback = SequentialExecutor::new(self.executor.units());
                let results = fallback.distribute(runner, total, seed)?;
                Ok((results, fallback.name()))
            }
            Err(err) => Err(err),
        }
    }
}

impl Default for MonteCarloEngine {
    fn default() -> Self {
        Self::with_default_executor()
    }
}
