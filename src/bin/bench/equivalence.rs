// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Parallel/Sequential Equivalence
//
// Runs the same configuration on the thread pool and on the calling thread.
// Both share one batch plan, so the samples must agree exactly.

use market_sim_engine::executor::{select_executor, SequentialExecutor};
use market_sim_engine::{EngineError, MonteCarloEngine, SimulationConfig};
use tracing::info;

use crate::report::EquivalenceCheck;

pub const TOLERANCE: f64 = 1e-9;

pub fn check(config: &SimulationConfig, units: usize) -> Result<EquivalenceCheck, EngineError> {
    let parallel = MonteCarloEngine::new(select_executor(units));
    let sequential = MonteCarloEngine::new(Box::new(SequentialExecutor::new(units)));

    let a = parallel.run(config)?;
    let b = sequential.run(config)?;
    parallel.destroy();

    let pm = a.statistics.net_profit.mean;
    let sm = b.statistics.net_profit.mean;
    let relative_difference = (pm - sm).abs() / sm.abs().max(f64::MIN_POSITIVE);
    let identical_samples = a.raw_results == b.raw_results;
    let passes = identical_samples && relative_difference <= TOLERANCE;

    info!(
        units,
        parallel = a.executor.as_str(),
        relative_difference,
        identical_samples,
        "equivalence check"
    );

    Ok(EquivalenceCheck {
        seed: a.seed,
        iterations: a.iterations,
        units,
        parallel_executor: a.executor,
        parallel_mean_net_profit: pm,
        sequential_mean_net_profit: sm,
        relative_difference,
        identical_samples,
        passes,
    })
}
