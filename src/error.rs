// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Run Errors

use crate::config::ConfigError;
use crate::executor::ExecutorError;
use crate::market::SimulationError;

/// Everything that can reject a run. A rejected run never yields a partial
/// result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("configuration rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("simulation aborted: {0}")]
    Simulation(#[from] SimulationError),
    #[error("execution failed: {0}")]
    Executor(#[from] ExecutorError),
    #[error("run produced {actual} trials, expected {expected}")]
    Truncated { expected: usize, actual: usize },
}
