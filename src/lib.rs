// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Monte Carlo Kernel

pub mod types;
pub mod config;
pub mod rng;
pub mod correlation;
pub mod market;
pub mod trial;
pub mod executor;
pub mod aggregate;
pub mod risk;
pub mod engine;
pub mod error;

pub use config::{ConfigError, ConfigOverrides, SimulationConfig};
pub use correlation::{CorrelationPreset, MarketScenario, ShockRecord};
pub use engine::{MonteCarloEngine, DEFAULT_SEED};
pub use error::EngineError;
pub use executor::{select_executor, SequentialExecutor, TrialExecutor};
pub use market::{CompetitiveMarketModel, MarketModel};
pub use types::*;

use serde::Serialize;
use wasm_bindgen::prelude::*;

// ─── WASM Interface ──────────────────────────────────────────────────────────

fn install_panic_hook() {
    #[cfg(target_arch = "wasm32")]
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
}

// Plain objects rather than `Map`s, and `null` for absent values.
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn parse_config(value: JsValue) -> Result<SimulationConfig, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&ConfigError::Parse(e.to_string()).to_string()))
}

/// Runs a full simulation. Rejections surface as a string describing the
/// first failure.
#[wasm_bindgen(js_name = runSimulation)]
pub fn run_simulation(config: JsValue) -> Result<JsValue, JsValue> {
    install_panic_hook();
    let config = parse_config(config)?;
    let result = MonteCarloEngine::shared()
        .run(&config)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_js(&result)
}

#[wasm_bindgen(js_name = validateConfig)]
pub fn validate_config(config: JsValue) -> Result<(), JsValue> {
    install_panic_hook();
    parse_config(config)?
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[derive(Serialize)]
struct PresetInfo {
    name: &'static str,
    label: &'static str,
    matrix: Vec<Vec<f64>>,
}

#[wasm_bindgen(js_name = correlationPresets)]
pub fn correlation_presets() -> JsValue {
    let presets: Vec<PresetInfo> = CorrelationPreset::ALL
        .iter()
        .map(|p| PresetInfo {
            name: p.name(),
            label: p.label(),
            matrix: p.matrix().rows().to_vec(),
        })
        .collect();
    to_js(&presets).unwrap_or(JsValue::NULL)
}
