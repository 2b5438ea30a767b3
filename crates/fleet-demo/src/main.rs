//! fleet-demo — run both dispatch policies on one generated scenario.
//!
//! Executes the same `(seed, scale)` world under the baseline
//! (EDF + nearest) policy and the GA planner, then prints the fleet metrics
//! side by side.  Both runs are fully deterministic; re-running the binary
//! reproduces every number, and the printed scenario hashes confirm the two
//! policies saw an identical world.

use std::time::Instant;

use anyhow::{Context, Result};

use fleet_core::{FleetConfig, Mode, RunContext, Scale};
use fleet_harness::{run_once, RunReport};

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED: u64 = 42;
const SCALE: Scale = Scale::Demo;
const GA_REPLAN_INTERVAL_S: u64 = 30;

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let config = FleetConfig {
        ga_replan_interval_s: GA_REPLAN_INTERVAL_S,
        ..FleetConfig::default()
    };
    let (n_robots, n_jobs) = SCALE.counts();

    println!("=== fleet-demo — AMR dispatch policy comparison ===");
    println!("Seed: {SEED}  |  Scale: {SCALE} ({n_robots} robots, {n_jobs} jobs)");
    println!();

    let t0 = Instant::now();
    let baseline = run_once(&config, &RunContext::new("demo-baseline", Mode::Baseline, SEED, SCALE))
        .context("baseline run")?;
    let baseline_elapsed = t0.elapsed();

    let t1 = Instant::now();
    let ga = run_once(&config, &RunContext::new("demo-ga", Mode::Ga, SEED, SCALE))
        .context("ga run")?;
    let ga_elapsed = t1.elapsed();

    let hash = |r: &RunReport| r.scenario_hash.clone().unwrap_or_default();
    println!("Scenario hash (baseline): {}", hash(&baseline));
    println!("Scenario hash (ga):       {}", hash(&ga));
    if hash(&baseline) == hash(&ga) {
        println!("Identical scenarios confirmed.");
    }
    println!();

    let bm = baseline
        .metrics
        .context("baseline run produced no metrics")?;
    let gm = ga.metrics.context("ga run produced no metrics")?;

    println!("{:<22} {:>14} {:>14}", "Metric", "baseline", "ga");
    println!("{}", "-".repeat(52));
    println!("{:<22} {:>14} {:>14}", "completed_jobs", bm.completed_jobs, gm.completed_jobs);
    println!("{:<22} {:>14} {:>14}", "failed_jobs", bm.failed_jobs, gm.failed_jobs);
    println!("{:<22} {:>14.3} {:>14.3}", "on_time_rate", bm.on_time_rate, gm.on_time_rate);
    println!("{:<22} {:>14.1} {:>14.1}", "total_distance", bm.total_distance, gm.total_distance);
    println!(
        "{:<22} {:>14.1} {:>14.1}",
        "avg_completion_time", bm.avg_completion_time, gm.avg_completion_time
    );
    println!("{:<22} {:>14.1} {:>14.1}", "max_lateness", bm.max_lateness, gm.max_lateness);
    println!(
        "{:<22} {:>14} {:>14}",
        "job.assigned events", baseline.assignments, ga.assignments
    );
    println!();
    println!(
        "Wall time: baseline {:.2} s, ga {:.2} s (sim clock is decoupled)",
        baseline_elapsed.as_secs_f64(),
        ga_elapsed.as_secs_f64()
    );

    Ok(())
}
