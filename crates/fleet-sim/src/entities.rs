//! Runtime entity state owned by the engine.

use fleet_core::{JobId, JobState, Point, RobotId, RobotState};
use fleet_scenario::{JobSpec, RobotSpec};

// ── Robot ─────────────────────────────────────────────────────────────────────

/// A robot as the engine tracks it between ticks.
#[derive(Clone, Debug)]
pub struct Robot {
    pub id: RobotId,
    pub position: Point,
    /// Units per simulated second, fixed at generation.
    pub speed: f64,
    /// Percent in `[0, 100]`.
    pub battery: f64,
    pub state: RobotState,
    pub current_job_id: Option<JobId>,
    /// Waypoint for the current movement state (pickup or dropoff).
    pub target: Option<Point>,
    /// Remaining servicing countdown, in simulated seconds.
    pub service_remaining_s: f64,
    /// Total distance travelled, accumulated per movement step.
    pub distance_traveled: f64,
}

impl Robot {
    pub fn from_spec(spec: &RobotSpec) -> Self {
        Self {
            id:                  spec.id,
            position:            spec.position(),
            speed:               spec.speed,
            battery:             spec.battery,
            state:               spec.state,
            current_job_id:      None,
            target:              None,
            service_remaining_s: 0.0,
            distance_traveled:   0.0,
        }
    }

    /// Drop the active job and return to idle (also the defensive reset path
    /// when a movement state has no consistent job attached).
    pub fn clear_job(&mut self) {
        self.state = RobotState::Idle;
        self.current_job_id = None;
        self.target = None;
        self.service_remaining_s = 0.0;
    }
}

// ── Job ───────────────────────────────────────────────────────────────────────

/// A job as the engine tracks it, timestamps in whole simulated seconds.
#[derive(Clone, Debug)]
pub struct Job {
    pub id: JobId,
    pub pickup: Point,
    pub dropoff: Point,
    pub deadline_ts: u64,
    pub priority: u8,
    pub state: JobState,
    pub assigned_robot_id: Option<RobotId>,
    pub created_sim_ts: u64,
    pub started_sim_ts: Option<u64>,
    pub completed_sim_ts: Option<u64>,
    /// Signed `completed_sim_ts − deadline_ts`; negative means early.
    pub lateness_s: f64,
}

impl Job {
    pub fn from_spec(spec: &JobSpec) -> Self {
        Self {
            id:                spec.id.clone(),
            pickup:            spec.pickup(),
            dropoff:           spec.dropoff(),
            deadline_ts:       spec.deadline_ts,
            priority:          spec.priority,
            state:             spec.state,
            assigned_robot_id: None,
            created_sim_ts:    0,
            started_sim_ts:    None,
            completed_sim_ts:  None,
            lateness_s:        0.0,
        }
    }

    /// Lateness clamped to `>= 0` — the value used for penalties, metrics
    /// and the terminal job events.
    #[inline]
    pub fn lateness_clamped(&self) -> f64 {
        self.lateness_s.max(0.0)
    }
}
