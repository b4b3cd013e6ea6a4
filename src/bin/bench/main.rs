// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Market Simulation Suite - Benchmark Runner
//
// Usage:
//   cargo run --release --bin bench                         # All scenarios
//   cargo run --release --bin bench -- --iterations 200     # Quick mode
//   cargo run --release --bin bench -- shocks               # Filter by name or category
//   cargo run --release --bin bench -- --seed 7 --units 2   # Custom seed and pool size
//   RUST_LOG=debug cargo run --release --bin bench          # Engine logs

mod equivalence;
mod report;
mod scenarios;

use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use market_sim_engine::executor::{default_units, select_executor};
use market_sim_engine::MonteCarloEngine;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use report::*;
use scenarios::*;

// ─── CLI ────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "bench", about = "Monte Carlo market simulation benchmark")]
struct Cli {
    /// Trials per scenario.
    #[arg(long, default_value_t = 1_000)]
    iterations: u32,

    /// Base seed shared by every scenario.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Execution units; defaults to available parallelism.
    #[arg(long)]
    units: Option<usize>,

    /// Skip the parallel/sequential equivalence check.
    #[arg(long)]
    skip_equivalence: bool,

    /// Output directory for the JSON report.
    #[arg(long, default_value = "benchmark-results")]
    out_dir: PathBuf,

    /// Case-insensitive substring matched against name, label and category.
    filter: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let units = cli.units.unwrap_or_else(default_units);
    let all_scenarios = scenarios();

    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios
                .iter()
                .filter(|s| {
                    s.name.to_lowercase().contains(&f_lower)
                        || s.label.to_lowercase().contains(&f_lower)
                        || s.category.contains(&f_lower)
                })
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No scenarios match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    let engine = MonteCarloEngine::new(select_executor(units));
    let base = base_config(cli.iterations, cli.seed);

    println!("\n  Market Simulation Benchmark");
    println!(
        "  PRNG: ChaCha8Rng | Trials/scenario: {} | Seed: {} | Executor: {} x{}",
        cli.iterations,
        cli.seed,
        engine.executor_name(),
        units
    );
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!(
        "  {:<34} {:>12} {:>9} {:>8} {:>12} {:>8}",
        "Scenario", "NetProfit", "ROI", "P(loss)", "CVaR95", "Time"
    );
    println!("  {}", "-".repeat(88));

    let suite_start = Instant::now();
    let mut reports = Vec::with_capacity(to_run.len());

    for scenario in &to_run {
        let config = scenario.overrides.apply(&base);
        let start = Instant::now();
        let outcome = engine.run(&config);
        let elapsed = start.elapsed();

        let report = match outcome {
            Ok(result) => {
                let profitability = result.risk.as_ref().map(|r| &r.profitability);
                let report = ScenarioReport {
                    scenario_name: scenario.name.to_string(),
                    label: scenario.label.to_string(),
                    category: scenario.category.to_string(),
                    overrides: scenario.overrides.clone(),
                    iterations: result.iterations,
                    seed: result.seed,
                    executor: result.executor.clone(),
                    elapsed_ms: elapsed.as_millis(),
                    trials_per_sec: result.iterations as f64 / elapsed.as_secs_f64().max(1e-9),
                    net_profit: result.statistics.net_profit,
                    roi: result.statistics.roi,
                    unsold_pct: result.statistics.unsold_pct,
                    break_even_week: result.statistics.break_even_week,
                    prob_loss: profitability.map(|p| p.prob_loss),
                    net_loss_var95: profitability.map(|p| p.net_loss.var95),
                    net_loss_cvar95: profitability.map(|p| p.net_loss.cvar95),
                    error: None,
                };
                println!(
                    "  {:<34} {:>12.0} {:>8.1}% {:>7.1}% {:>12.0} {:>6}ms",
                    report.label,
                    report.net_profit.mean,
                    report.roi.mean * 100.0,
                    report.prob_loss.unwrap_or(0.0) * 100.0,
                    report.net_loss_cvar95.unwrap_or(0.0),
                    report.elapsed_ms,
                );
                report
            }
            Err(err) => {
                error!(scenario = scenario.name, error = %err, "scenario rejected");
                println!("  {:<34} REJECTED: {}", scenario.label, err);
                ScenarioReport {
                    scenario_name: scenario.name.to_string(),
                    label: scenario.label.to_string(),
                    category: scenario.category.to_string(),
                    overrides: scenario.overrides.clone(),
                    iterations: config.iterations,
                    seed: config.seed.unwrap_or(cli.seed),
                    executor: engine.executor_name().to_string(),
                    elapsed_ms: elapsed.as_millis(),
                    trials_per_sec: 0.0,
                    net_profit: Default::default(),
                    roi: Default::default(),
                    unsold_pct: Default::default(),
                    break_even_week: None,
                    prob_loss: None,
                    net_loss_var95: None,
                    net_loss_cvar95: None,
                    error: Some(err.to_string()),
                }
            }
        };
        reports.push(report);
    }
    engine.destroy();

    let suite_ms = suite_start.elapsed().as_millis();

    // ─── Equivalence ────────────────────────────────────────────────────

    let equivalence = if cli.skip_equivalence {
        None
    } else {
        let config = base_config(500, 42);
        match equivalence::check(&config, units) {
            Ok(check) => {
                println!(
                    "\n  Parallel vs sequential (seed 42, 500 trials): {} (rel diff {:.2e})",
                    if check.passes { "PASS" } else { "FAIL" },
                    check.relative_difference
                );
                Some(check)
            }
            Err(err) => {
                error!(error = %err, "equivalence check failed to run");
                println!("\n  Parallel vs sequential: ERROR {err}");
                None
            }
        }
    };

    // ─── Summary ────────────────────────────────────────────────────────

    let total = reports.len();
    let rejected = reports.iter().filter(|r| r.error.is_some()).count();
    println!("  {}", "-".repeat(88));
    println!(
        "  Total: {}  Completed: {}  Rejected: {}  Suite time: {:.1}s\n",
        total,
        total - rejected,
        rejected,
        suite_ms as f64 / 1_000.0
    );

    let equivalence_failed = !cli.skip_equivalence
        && equivalence.as_ref().map(|c| !c.passes).unwrap_or(true);

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let timestamp = ts.to_string();

    let report = BenchReport {
        timestamp: timestamp.clone(),
        version: env!("CARGO_PKG_VERSION"),
        prng: "ChaCha8Rng",
        units,
        summary: Summary { total, completed: total - rejected, rejected, suite_ms },
        equivalence,
        scenarios: reports,
    };

    if let Err(err) = write_report(&cli.out_dir, &timestamp, &report) {
        eprintln!("  Failed to write report: {err}");
        std::process::exit(1);
    }

    if rejected > 0 || equivalence_failed {
        std::process::exit(1);
    }
}

fn write_report(dir: &std::path::Path, timestamp: &str, report: &BenchReport) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("bench-{timestamp}.json"));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;
    info!(path = %path.display(), "report written");
    println!("  Results saved to: {}\n", path.display());
    Ok(())
}
