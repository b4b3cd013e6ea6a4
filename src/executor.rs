// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Batch Executors
//
// Splits a run into contiguous batches with disjoint seeds and executes them
// either on a rayon thread pool or on the calling thread. Both paths use the
// same batch plan, so a given seed always maps to the same samples.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::trial::TrialRunner;
use crate::types::TrialResult;

/// Seed distance between consecutive batches.
pub const BATCH_SEED_STRIDE: u64 = 1_000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("failed to start {units} execution units: {reason}")]
    Startup { units: usize, reason: String },
    #[error("execution pool has been terminated")]
    Terminated,
}

// ---------------------------------------------------------------------------
// Batch planning
// ---------------------------------------------------------------------------

/// Contiguous iteration range plus the seed of its private stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub index: usize,
    pub start: u32,
    pub len: u32,
    pub seed: u64,
}

/// Batches of `ceil(total / units)` iterations; the last may be shorter.
/// Batch `i` is seeded with `seed + i * BATCH_SEED_STRIDE`.
pub fn plan_batches(total: u32, units: usize, seed: u64) -> Vec<Batch> {
    let units = units.max(1) as u32;
    let size = total.div_ceil(units).max(1);
    let mut batches = Vec::with_capacity(units as usize);
    let mut start = 0;
    while start < total {
        let index = batches.len();
        let len = size.min(total - start);
        batches.push(Batch {
            index,
            start,
            len,
            seed: seed + index as u64 * BATCH_SEED_STRIDE,
        });
        start += len;
    }
    batches
}

// ---------------------------------------------------------------------------
// TrialExecutor
// ---------------------------------------------------------------------------

/// Runs planned batches. Output is indexed by batch, never by completion order.
pub trait TrialExecutor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of execution units the plan is sized for.
    fn units(&self) -> usize;

    fn execute(
        &self,
        runner: &TrialRunner<'_>,
        batches: &[Batch],
    ) -> Result<Vec<Vec<TrialResult>>, EngineError>;

    /// Releases execution units. Safe to call more than once.
    fn destroy(&self) {}

    /// Plans, executes and concatenates `total` trials in batch order.
    fn distribute(
        &self,
        runner: &TrialRunner<'_>,
        total: u32,
        seed: u64,
    ) -> Result<Vec<TrialResult>, EngineError> {
        let batches = plan_batches(total, self.units(), seed);
        debug!(executor = self.name(), batches = batches.len(), total, seed, "distributing trials");
        let per_batch = self.execute(runner, &batches)?;
        Ok(per_batch.into_iter().flatten().collect())
    }
}

// ─── Sequential ─────────────────────────────────────────────────────────────

/// Single-threaded executor. Sized like the parallel pool it stands in for so
/// the batch plan, and therefore every sample, is identical.
#[derive(Debug, Clone, Copy)]
pub struct SequentialExecutor {
    units: usize,
}

impl SequentialExecutor {
    pub fn new(units: usize) -> Self {
        Self { units: units.max(1) }
    }
}

impl Default for SequentialExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TrialExecutor for SequentialExecutor {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn units(&self) -> usize {
        self.units
    }

    fn execute(
        &self,
        runner: &TrialRunner<'_>,
        batches: &[Batch],
    ) -> Result<Vec<Vec<TrialResult>>, EngineError> {
        batches
            .iter()
            .map(|batch| runner.run_batch(batch).map_err(EngineError::from))
            .collect()
    }
}

// ─── Parallel ───────────────────────────────────────────────────────────────

#[cfg(not(target_arch = "wasm32"))]
pub use parallel::ParallelExecutor;

#[cfg(not(target_arch = "wasm32"))]
mod parallel {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use rayon::prelude::*;
    use rayon::{ThreadPool, ThreadPoolBuilder};
    use tracing::info;

    use super::*;

    /// Rayon-backed executor. The pool is created once in [`init`](Self::init)
    /// and reused across runs until [`destroy`](TrialExecutor::destroy).
    pub struct ParallelExecutor {
        units: usize,
        pool: Mutex<Option<Arc<ThreadPool>>>,
    }

    impl ParallelExecutor {
        pub fn init(units: usize) -> Result<Self, ExecutorError> {
            if units == 0 {
                return Err(ExecutorError::Startup {
                    units,
                    reason: "unit count must be positive".to_string(),
                });
            }
            let pool = ThreadPoolBuilder::new()
                .num_threads(units)
                .thread_name(|i| format!("trial-unit-{i}"))
                .build()
                .map_err(|e| ExecutorError::Startup { units, reason: e.to_string() })?;
            info!(units, "parallel executor started");
            Ok(Self { units, pool: Mutex::new(Some(Arc::new(pool))) })
        }

        pub fn is_active(&self) -> bool {
            self.pool.lock().is_some()
        }
    }

    impl TrialExecutor for ParallelExecutor {
        fn name(&self) -> &'static str {
            "parallel"
        }

        fn units(&self) -> usize {
            self.units
        }

        fn execute(
            &self,
            runner: &TrialRunner<'_>,
            batches: &[Batch],
        ) -> Result<Vec<Vec<TrialResult>>, EngineError> {
            // Clone out of the lock so destroy() never waits on a running batch.
            let pool = self.pool.lock().clone().ok_or(ExecutorError::Terminated)?;
            let results = pool.install(|| {
                batches
                    .par_iter()
                    .map(|batch| runner.run_batch(batch))
                    .collect::<Result<Vec<_>, _>>()
            })?;
            Ok(results)
        }

        fn destroy(&self) {
            if self.pool.lock().take().is_some() {
                info!(units = self.units, "parallel executor terminated");
            }
        }
    }

    impl Drop for ParallelExecutor {
        fn drop(&mut self) {
            self.destroy();
        }
    }
}

// ─── Selection ──────────────────────────────────────────────────────────────

/// Execution units available to this process; 1 where threads are unknown.
pub fn default_units() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(not(target_arch = "wasm32"))]
fn start_parallel(units: usize) -> Option<Box<dyn TrialExecutor>> {
    match ParallelExecutor::init(units) {
        Ok(pool) => Some(Box::new(pool)),
        Err(err) => {
            warn!(error = %err, "parallel executor unavailable, using sequential");
            None
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn start_parallel(units: usize) -> Option<Box<dyn TrialExecutor>> {
    warn!(units, "no thread support on this target, using sequential");
    None
}

/// Picks the executor once at startup: the parallel pool when it starts,
/// otherwise a sequential executor with the same unit count.
pub fn select_executor(units: usize) -> Box<dyn TrialExecutor> {
    start_parallel(units).unwrap_or_else(|| Box::new(SequentialExecutor::new(units)))
}
