//! Planner request/response contract.
//!
//! These mirror the wire schema an out-of-process optimizer service would
//! speak; [`Planner`] is the seam where an HTTP client would replace the
//! in-process [`GaPlanner`][crate::GaPlanner].

use std::cmp::Reverse;

use fleet_core::{JobId, Mode, Point, RobotId, RobotState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Inputs ────────────────────────────────────────────────────────────────────

/// A robot as the dispatcher last saw it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanRobot {
    pub id: RobotId,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub battery: f64,
    pub state: RobotState,
}

impl PlanRobot {
    #[inline]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A pending job snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanJob {
    pub id: JobId,
    pub pickup_x: f64,
    pub pickup_y: f64,
    pub dropoff_x: f64,
    pub dropoff_y: f64,
    pub deadline_ts: u64,
    pub priority: u8,
}

impl PlanJob {
    #[inline]
    pub fn pickup(&self) -> Point {
        Point::new(self.pickup_x, self.pickup_y)
    }

    #[inline]
    pub fn dropoff(&self) -> Point {
        Point::new(self.dropoff_x, self.dropoff_y)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanRequest {
    pub run_id: String,
    pub seed: u64,
    pub mode: Mode,
    pub sim_time_s: u64,
    pub robots: Vec<PlanRobot>,
    pub pending_jobs: Vec<PlanJob>,
}

// ── Outputs ───────────────────────────────────────────────────────────────────

/// One decoded gene of the winning chromosome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanAssignment {
    pub job_id: JobId,
    pub robot_id: RobotId,
    /// The winning chromosome's total fitness (shared by every row).
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanMeta {
    pub best_score: f64,
    pub generations: u32,
    pub population_size: usize,
    pub seed: u64,
}

/// Assignments in canonical job order, plus run metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub assignments: Vec<PlanAssignment>,
    pub meta: PlanMeta,
}

// ── Seam ──────────────────────────────────────────────────────────────────────

/// The dispatcher's view of an optimizer.
pub trait Planner {
    fn plan(&self, request: &PlanRequest) -> PlanResult<PlanResponse>;
}

/// Planner failure taxonomy: the dispatcher logs, clears its single-flight
/// flag and waits for the next trigger — it never falls back to baseline.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("optimizer unavailable: {0}")]
    Unavailable(String),

    #[error("optimizer request timed out after {0} s")]
    Timeout(u64),

    #[error("optimizer returned an invalid response: {0}")]
    InvalidResponse(String),
}

pub type PlanResult<T> = Result<T, PlanError>;

// ── Canonical order ───────────────────────────────────────────────────────────

/// Sort jobs into canonical order: `(deadline_ts ASC, priority DESC,
/// job_id ASC)`.  Every assignment list in the system is keyed to this sort.
pub fn canonical_job_order(jobs: &mut [PlanJob]) {
    jobs.sort_by(|a, b| {
        (a.deadline_ts, Reverse(a.priority), &a.id).cmp(&(b.deadline_ts, Reverse(b.priority), &b.id))
    });
}
