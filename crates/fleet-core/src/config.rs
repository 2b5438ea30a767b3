//! Run configuration.
//!
//! Every knob the simulator, dispatcher and optimizer consult lives in
//! [`FleetConfig`]; application crates typically load it from a TOML/JSON
//! file or environment and pass it down.  Defaults match the documented
//! demo deployment.

use crate::{Mode, Scale};

/// Top-level configuration shared by all components of a run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FleetConfig {
    // ── Simulation ────────────────────────────────────────────────────────
    /// Ticks per simulated second.  Default: 5 (0.2 s per tick).
    pub sim_tick_hz: u32,
    /// Side length of the square world.
    pub world_size: f64,
    /// Hard stop for a run, in simulated seconds.
    pub max_sim_seconds: u64,
    /// Seconds a robot spends servicing at a pickup.
    pub service_time_s: u32,
    /// Robot speed range sampled at scenario generation (units/second).
    pub robot_speed_min: f64,
    pub robot_speed_max: f64,

    // ── Battery ───────────────────────────────────────────────────────────
    /// Dispatcher eligibility threshold (percent).
    pub battery_threshold: f64,
    /// Percent recovered per simulated second while charging.
    pub charge_rate: f64,
    /// Percent at which a charging robot resumes work.
    pub charge_resume_threshold: f64,
    /// Percent drained per simulated second while non-idle and not charging
    /// (a fixed per-tick amount of `battery_drain_per_s / sim_tick_hz`).
    /// Sized so demo-scale runs deplete only occasionally: 0.25 %/sim-sec
    /// is 0.05 %/tick at the default 5 Hz.
    pub battery_drain_per_s: f64,

    // ── Deadlines ─────────────────────────────────────────────────────────
    /// Uniform slack range added on top of the minimum feasible travel +
    /// service time when drawing each job's deadline.
    pub deadline_slack_min_s: u64,
    pub deadline_slack_max_s: u64,

    // ── GA planner ────────────────────────────────────────────────────────
    /// Periodic replan interval in simulated seconds; 0 disables.
    pub ga_replan_interval_s: u64,
    pub ga_population_size: usize,
    pub ga_generations: u32,
    pub ga_elite_size: usize,
    pub ga_mutation_rate: f64,
    pub ga_crossover_rate: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            sim_tick_hz:             5,
            world_size:              100.0,
            max_sim_seconds:         3600,
            service_time_s:          5,
            robot_speed_min:         1.0,
            robot_speed_max:         2.0,
            battery_threshold:       20.0,
            charge_rate:             5.0,
            charge_resume_threshold: 20.0,
            battery_drain_per_s:     0.25,
            deadline_slack_min_s:    120,
            deadline_slack_max_s:    600,
            ga_replan_interval_s:    0,
            ga_population_size:      64,
            ga_generations:          80,
            ga_elite_size:           4,
            ga_mutation_rate:        0.10,
            ga_crossover_rate:       0.90,
        }
    }
}

// ── RunContext ────────────────────────────────────────────────────────────────

/// Immutable identity of one run, as injected by `run.started`.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunContext {
    pub run_id: String,
    pub mode: Mode,
    pub seed: u64,
    pub scale: Scale,
    /// Override the scale's robot count.  Must be supplied together with
    /// `jobs_override`.
    pub robots_override: Option<usize>,
    pub jobs_override: Option<usize>,
}

impl RunContext {
    pub fn new(run_id: impl Into<String>, mode: Mode, seed: u64, scale: Scale) -> Self {
        Self {
            run_id: run_id.into(),
            mode,
            seed,
            scale,
            robots_override: None,
            jobs_override: None,
        }
    }

    /// Effective `(n_robots, n_jobs)` after applying overrides.
    pub fn counts(&self) -> (usize, usize) {
        let (r, j) = self.scale.counts();
        (
            self.robots_override.unwrap_or(r),
            self.jobs_override.unwrap_or(j),
        )
    }
}
