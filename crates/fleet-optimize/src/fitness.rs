//! Chromosome evaluation.
//!
//! A chromosome assigns the k-th canonical job to the `g[k]`-th canonical
//! robot.  Fitness simulates each robot's sequence of assigned jobs from its
//! current position and battery, starting the clock at `sim_time_s`, and is
//! minimized.

use crate::plan::{PlanJob, PlanRobot};

/// Weights of the penalty terms.  Lateness dominates by three orders of
/// magnitude so deadline misses are traded away first.
const LATENESS_WEIGHT: f64 = 1000.0;
const DISTANCE_WEIGHT: f64 = 2.0;
const PRIORITY_WEIGHT: f64 = 3.0;
const LOAD_WEIGHT: f64 = 30.0;

const BATTERY_DEPLETED_BASE: f64 = 500.0;
const BATTERY_DEPLETED_PER_PCT: f64 = 100.0;
const BATTERY_LOW_PENALTY: f64 = 200.0;
const BATTERY_LOW_PCT: f64 = 10.0;

/// Floor applied to robot speed so a degenerate snapshot cannot divide by
/// zero.
const SPEED_FLOOR: f64 = 0.1;

/// Score awarded per job when there is no robot to execute it.
const NO_ROBOT_SCORE: f64 = 1e9;

/// Evaluate one chromosome.  `jobs` must already be in canonical order and
/// `robots` in id order; `chromosome.len() == jobs.len()`.
pub fn evaluate_chromosome(
    chromosome: &[usize],
    robots: &[PlanRobot],
    jobs: &[PlanJob],
    sim_time_s: u64,
    service_time_s: f64,
    battery_drain_per_s: f64,
) -> f64 {
    if jobs.is_empty() {
        return 0.0;
    }
    if robots.is_empty() {
        return NO_ROBOT_SCORE * jobs.len() as f64;
    }

    let mut robot_time: Vec<f64> = vec![sim_time_s as f64; robots.len()];
    let mut robot_pos: Vec<_> = robots.iter().map(|r| r.position()).collect();
    let mut robot_battery: Vec<f64> = robots.iter().map(|r| r.battery).collect();
    let mut robot_job_count: Vec<u64> = vec![0; robots.len()];

    let mut total = 0.0;

    for (k, job) in jobs.iter().enumerate() {
        let r = chromosome[k] % robots.len();

        let distance = robot_pos[r].distance(job.pickup()) + job.pickup().distance(job.dropoff());
        let speed = robots[r].speed.max(SPEED_FLOOR);
        let busy_time = distance / speed + service_time_s;
        let finish_time = robot_time[r] + busy_time;
        let lateness = (finish_time - job.deadline_ts as f64).max(0.0);

        // Drain accrues per busy second, matching the engine's per-tick model.
        let battery_after = robot_battery[r] - busy_time * battery_drain_per_s;
        let battery_penalty = if battery_after < 0.0 {
            BATTERY_DEPLETED_BASE + battery_after.abs() * BATTERY_DEPLETED_PER_PCT
        } else if battery_after < BATTERY_LOW_PCT {
            BATTERY_LOW_PENALTY
        } else {
            0.0
        };

        total += lateness * LATENESS_WEIGHT
            + distance * DISTANCE_WEIGHT
            + (6 - job.priority) as f64 * PRIORITY_WEIGHT
            + battery_penalty;

        robot_time[r] = finish_time;
        robot_pos[r] = job.dropoff();
        robot_battery[r] = battery_after.max(0.0);
        robot_job_count[r] += 1;
    }

    // Per-robot load-balance term, quadratic in the final job count.
    total += robot_job_count
        .iter()
        .map(|&count| (count * count) as f64 * LOAD_WEIGHT)
        .sum::<f64>();

    total
}
