//! Scenario generation and hashing.

use fleet_core::{round3, FleetConfig, JobId, JobState, Point, RobotId, RobotState, RunContext, SimRng};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

// ── Specs ─────────────────────────────────────────────────────────────────────

/// A robot as generated: full battery, idle, position and speed from the RNG.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RobotSpec {
    pub id: RobotId,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub battery: f64,
    pub state: RobotState,
}

impl RobotSpec {
    #[inline]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A job as generated: pickup/dropoff, deadline, priority, pending.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobSpec {
    pub id: JobId,
    pub pickup_x: f64,
    pub pickup_y: f64,
    pub dropoff_x: f64,
    pub dropoff_y: f64,
    pub deadline_ts: u64,
    pub priority: u8,
    pub state: JobState,
}

impl JobSpec {
    #[inline]
    pub fn pickup(&self) -> Point {
        Point::new(self.pickup_x, self.pickup_y)
    }

    #[inline]
    pub fn dropoff(&self) -> Point {
        Point::new(self.dropoff_x, self.dropoff_y)
    }
}

/// One generated world, plus its reproducibility digest.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub robots: Vec<RobotSpec>,
    pub jobs: Vec<JobSpec>,
    pub hash: String,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("robots and jobs overrides must be provided together")]
    PartialOverride,

    #[error("{what} override must be > 0")]
    ZeroOverride { what: &'static str },

    #[error("scenario serialization failed: {0}")]
    Hash(#[from] serde_json::Error),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;

// ── Generation ────────────────────────────────────────────────────────────────

/// Generate the world for `ctx` deterministically.
///
/// # Draw order (the determinism contract)
///
/// One `SimRng` seeded with `ctx.seed`, consumed strictly as:
///
/// 1. Robots in id order, per robot: `x`, `y`, `speed`.
/// 2. Jobs in id order, per job: `pickup.x`, `pickup.y`, `dropoff.x`,
///    `dropoff.y`, deadline slack, `priority`.
///
/// All coordinates and speeds are rounded to 3 decimals before use, so the
/// hash payload and the simulated world agree exactly.
pub fn generate(config: &FleetConfig, ctx: &RunContext) -> ScenarioResult<Scenario> {
    match (ctx.robots_override, ctx.jobs_override) {
        (Some(_), None) | (None, Some(_)) => return Err(ScenarioError::PartialOverride),
        (Some(0), _) => return Err(ScenarioError::ZeroOverride { what: "robots" }),
        (_, Some(0)) => return Err(ScenarioError::ZeroOverride { what: "jobs" }),
        _ => {}
    }
    let (n_robots, n_jobs) = ctx.counts();

    let mut rng = SimRng::new(ctx.seed);

    let robots: Vec<RobotSpec> = (1..=n_robots as u32)
        .map(|id| RobotSpec {
            id:      RobotId(id),
            x:       round3(rng.gen_range(0.0..config.world_size)),
            y:       round3(rng.gen_range(0.0..config.world_size)),
            speed:   round3(rng.gen_range(config.robot_speed_min..config.robot_speed_max)),
            battery: 100.0,
            state:   RobotState::Idle,
        })
        .collect();

    let jobs: Vec<JobSpec> = (1..=n_jobs)
        .map(|n| {
            let pickup_x = round3(rng.gen_range(0.0..config.world_size));
            let pickup_y = round3(rng.gen_range(0.0..config.world_size));
            let dropoff_x = round3(rng.gen_range(0.0..config.world_size));
            let dropoff_y = round3(rng.gen_range(0.0..config.world_size));
            let slack: u64 =
                rng.gen_range(config.deadline_slack_min_s..=config.deadline_slack_max_s);
            let priority: u8 = rng.gen_range(1..=5);

            // Deadline: minimum feasible carry time at the slowest possible
            // speed, plus service, plus the drawn slack.
            let carry = Point::new(pickup_x, pickup_y)
                .distance(Point::new(dropoff_x, dropoff_y));
            let deadline_ts = (carry / config.robot_speed_min).ceil() as u64
                + config.service_time_s as u64
                + slack;

            JobSpec {
                id: JobId::nth(n),
                pickup_x,
                pickup_y,
                dropoff_x,
                dropoff_y,
                deadline_ts,
                priority,
                state: JobState::Pending,
            }
        })
        .collect();

    let hash = scenario_hash(ctx.seed, ctx.scale.as_str(), &robots, &jobs)?;
    Ok(Scenario { robots, jobs, hash })
}

/// Digest the ordered scenario payload.  Field order is the struct
/// declaration order (serde preserves it), so the bytes — and therefore the
/// hash — are stable.
fn scenario_hash(
    seed: u64,
    scale: &str,
    robots: &[RobotSpec],
    jobs: &[JobSpec],
) -> ScenarioResult<String> {
    #[derive(Serialize)]
    struct HashPayload<'a> {
        seed: u64,
        scale: &'a str,
        robots: &'a [RobotSpec],
        jobs: &'a [JobSpec],
    }

    let encoded = serde_json::to_vec(&HashPayload { seed, scale, robots, jobs })?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    Ok(out)
}
