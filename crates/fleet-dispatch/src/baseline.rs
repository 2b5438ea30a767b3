//! Baseline dispatch heuristic: earliest deadline first, nearest idle robot.

use std::collections::{BTreeMap, BTreeSet};

use fleet_core::{JobId, RobotId, RobotState};

use crate::projection::{JobView, RobotView};

/// Reason string carried on every baseline `job.assigned`.
pub const BASELINE_REASON: &str = "baseline_edf_nearest";

#[derive(Clone, Debug, PartialEq)]
pub struct BaselineAssignment {
    pub job_id: JobId,
    pub robot_id: RobotId,
}

/// One baseline sweep.
///
/// Pending jobs are walked in canonical order; each takes the nearest unused
/// idle eligible robot (ties on ascending robot id).  If no idle robot
/// clears the battery threshold, idle robots below it are considered so a
/// drained fleet does not stall outright — which is why battery gating is
/// only a hard guarantee in GA mode.
///
/// The returned list stays in canonical job order.
pub fn compute_baseline_assignments(
    robots: &BTreeMap<RobotId, RobotView>,
    jobs: &BTreeMap<JobId, JobView>,
    already_assigned: &BTreeSet<JobId>,
    blocked_robots: &BTreeSet<RobotId>,
    battery_threshold: f64,
) -> Vec<BaselineAssignment> {
    let mut pending: Vec<&JobView> = jobs
        .values()
        .filter(|j| j.state.is_assignable() && !already_assigned.contains(&j.id))
        .collect();

    let idle = |r: &&RobotView| r.state == RobotState::Idle && !blocked_robots.contains(&r.id);
    let mut idle_robots: Vec<&RobotView> = robots
        .values()
        .filter(idle)
        .filter(|r| r.battery >= battery_threshold)
        .collect();
    if idle_robots.is_empty() && !pending.is_empty() {
        idle_robots = robots.values().filter(idle).collect();
    }

    pending.sort_by(|a, b| {
        (a.deadline_ts, std::cmp::Reverse(a.priority), &a.id)
            .cmp(&(b.deadline_ts, std::cmp::Reverse(b.priority), &b.id))
    });

    let mut assignments = Vec::new();
    let mut used: BTreeSet<RobotId> = BTreeSet::new();

    for job in pending {
        let mut best: Option<(&RobotView, f64)> = None;
        for robot in &idle_robots {
            if used.contains(&robot.id) {
                continue;
            }
            let d = robot.position().distance(job.pickup());
            best = Some(match best {
                None => (robot, d),
                Some((current, best_d)) => {
                    if d < best_d || (d == best_d && robot.id < current.id) {
                        (robot, d)
                    } else {
                        (current, best_d)
                    }
                }
            });
        }
        let Some((robot, _)) = best else { continue };
        used.insert(robot.id);
        assignments.push(BaselineAssignment {
            job_id: job.id.clone(),
            robot_id: robot.id,
        });
    }

    assignments
}
