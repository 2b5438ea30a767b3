//! Per-run projection of world state, built from consumed events.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use fleet_core::{JobId, JobState, Point, RobotId, RobotState};
use fleet_events::payload::RunIdentity;

// ── Views ─────────────────────────────────────────────────────────────────────

/// Latest known robot state.  Fields missing from a `robot.updated` keep
/// their previous value (or a neutral default for a never-seen robot).
#[derive(Clone, Debug)]
pub struct RobotView {
    pub id: RobotId,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub battery: f64,
    pub state: RobotState,
    pub current_job_id: Option<JobId>,
    pub sim_time_s: u64,
}

impl RobotView {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Job facts from `job.created`, plus the dispatcher's optimistic state.
#[derive(Clone, Debug)]
pub struct JobView {
    pub id: JobId,
    pub pickup_x: f64,
    pub pickup_y: f64,
    pub dropoff_x: f64,
    pub dropoff_y: f64,
    pub deadline_ts: u64,
    pub priority: u8,
    pub state: JobState,
}

impl JobView {
    pub fn pickup(&self) -> Point {
        Point::new(self.pickup_x, self.pickup_y)
    }
}

// ── Projection ────────────────────────────────────────────────────────────────

/// Everything the dispatcher tracks for one run.
pub struct RunProjection {
    pub identity: RunIdentity,
    pub robots: BTreeMap<RobotId, RobotView>,
    pub jobs: BTreeMap<JobId, JobView>,
    /// Jobs this dispatcher has already emitted `job.assigned` for.
    pub assigned: BTreeSet<JobId>,
    /// GA plan output: jobs committed to a robot but not yet handed to the
    /// simulator.
    pub planned_queues: BTreeMap<RobotId, Vec<JobId>>,
    /// Assignments emitted but not yet confirmed by a `robot.updated` —
    /// suppresses double dispatch on stale idle events.
    pub pending_assignments: BTreeMap<RobotId, JobId>,
    /// Single-flight guard: at most one optimizer call per run, all
    /// triggers coalesced while it is set.
    pub in_flight_optimize: bool,
    /// Next sim-second at which a periodic replan may fire (when enabled).
    pub next_periodic_replan_s: Option<u64>,
    /// Throttle: the baseline sweep runs at most once per sim-second.
    pub last_baseline_dispatch_s: Option<u64>,
}

impl RunProjection {
    pub fn new(identity: RunIdentity, ga_replan_interval_s: u64) -> Self {
        Self {
            identity,
            robots: BTreeMap::new(),
            jobs: BTreeMap::new(),
            assigned: BTreeSet::new(),
            planned_queues: BTreeMap::new(),
            pending_assignments: BTreeMap::new(),
            in_flight_optimize: false,
            next_periodic_replan_s: (ga_replan_interval_s > 0).then_some(ga_replan_interval_s),
            last_baseline_dispatch_s: None,
        }
    }

    /// Pending jobs in canonical order: `(deadline_ts ASC, priority DESC,
    /// job_id ASC)`.
    pub fn pending_jobs(&self) -> Vec<&JobView> {
        let mut pending: Vec<&JobView> = self
            .jobs
            .values()
            .filter(|j| j.state.is_assignable() && !self.assigned.contains(&j.id))
            .collect();
        pending.sort_by(|a, b| {
            (a.deadline_ts, Reverse(a.priority), &a.id)
                .cmp(&(b.deadline_ts, Reverse(b.priority), &b.id))
        });
        pending
    }

    pub fn has_pending_jobs(&self) -> bool {
        self.jobs
            .values()
            .any(|j| j.state.is_assignable() && !self.assigned.contains(&j.id))
    }

    /// Robots eligible for new assignments, in id order: not charging and at
    /// or above the battery threshold.
    pub fn eligible_robots(&self, battery_threshold: f64) -> Vec<&RobotView> {
        self.robots
            .values()
            .filter(|r| r.state != RobotState::Charging && r.battery >= battery_threshold)
            .collect()
    }
}
