//! Typed event bodies.

use fleet_core::{JobId, JobState, Mode, RobotId, RobotState, Scale};
use serde::{Deserialize, Serialize};

use crate::keys;

// ── Bodies ────────────────────────────────────────────────────────────────────

/// One event body; the `event_type` tag doubles as the routing key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum EventBody {
    #[serde(rename = "run.started")]
    RunStarted(RunStarted),
    #[serde(rename = "job.created")]
    JobCreated(JobCreated),
    #[serde(rename = "robot.updated")]
    RobotUpdated(RobotUpdated),
    #[serde(rename = "job.assigned")]
    JobAssigned(JobAssigned),
    #[serde(rename = "job.completed")]
    JobCompleted(JobTerminal),
    #[serde(rename = "job.failed")]
    JobFailed(JobTerminal),
    #[serde(rename = "snapshot.tick")]
    SnapshotTick(SnapshotTick),
    #[serde(rename = "telemetry.received")]
    TelemetryReceived(TelemetryReceived),
    #[serde(rename = "run.completed")]
    RunCompleted(RunCompleted),
}

impl EventBody {
    /// The routing key this body is published under.
    pub fn routing_key(&self) -> &'static str {
        match self {
            EventBody::RunStarted(_)        => keys::RUN_STARTED,
            EventBody::JobCreated(_)        => keys::JOB_CREATED,
            EventBody::RobotUpdated(_)      => keys::ROBOT_UPDATED,
            EventBody::JobAssigned(_)       => keys::JOB_ASSIGNED,
            EventBody::JobCompleted(_)      => keys::JOB_COMPLETED,
            EventBody::JobFailed(_)         => keys::JOB_FAILED,
            EventBody::SnapshotTick(_)      => keys::SNAPSHOT_TICK,
            EventBody::TelemetryReceived(_) => keys::TELEMETRY_RECEIVED,
            EventBody::RunCompleted(_)      => keys::RUN_COMPLETED,
        }
    }

    /// Entity label folded into the deterministic `event_id`.
    pub fn entity(&self) -> String {
        match self {
            EventBody::RunStarted(_) | EventBody::RunCompleted(_) => "run".to_owned(),
            EventBody::SnapshotTick(_)                            => "snapshot".to_owned(),
            EventBody::JobCreated(b)                              => b.job_id.0.clone(),
            EventBody::JobAssigned(b)                             => b.job_id.0.clone(),
            EventBody::JobCompleted(b) | EventBody::JobFailed(b)  => b.job_id.0.clone(),
            EventBody::RobotUpdated(b)                            => format!("robot_{}", b.robot_id.0),
            EventBody::TelemetryReceived(b)                       => format!("r{}", b.robot_id.0),
        }
    }
}

// ── run.started ───────────────────────────────────────────────────────────────

/// Injected at the boundary to start a run.  Identity fields live in the
/// envelope header; only the optional scenario overrides are body-level.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStarted {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robots: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

// ── job.created ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobCreated {
    pub job_id: JobId,
    pub pickup_x: f64,
    pub pickup_y: f64,
    pub dropoff_x: f64,
    pub dropoff_y: f64,
    pub deadline_ts: u64,
    pub priority: u8,
    pub state: JobState,
}

// ── robot.updated ─────────────────────────────────────────────────────────────

/// Required keys are `robot_id` and `state` (plus the envelope's
/// `sim_time_s`); position/speed/battery are optional per the contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotUpdated {
    pub robot_id: RobotId,
    pub state: RobotState,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(default)]
    pub current_job_id: Option<JobId>,
}

// ── job.assigned ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobAssigned {
    pub job_id: JobId,
    pub robot_id: RobotId,
    pub reason: String,
    pub idempotency_key: String,
}

// ── job.completed / job.failed ────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobTerminal {
    pub job_id: JobId,
    #[serde(default)]
    pub robot_id: Option<RobotId>,
    pub lateness_s: f64,
}

// ── snapshot.tick ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotTick {
    pub snapshot: Snapshot,
}

/// The full world view at one tick: robots then jobs, each in id order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub robots: Vec<SnapshotRobot>,
    pub jobs: Vec<SnapshotJob>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRobot {
    pub id: RobotId,
    pub x: f64,
    pub y: f64,
    pub speed: f64,
    pub battery: f64,
    pub state: RobotState,
    pub current_job_id: Option<JobId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotJob {
    pub id: JobId,
    pub pickup_x: f64,
    pub pickup_y: f64,
    pub dropoff_x: f64,
    pub dropoff_y: f64,
    pub deadline_ts: u64,
    pub priority: u8,
    pub state: JobState,
    pub assigned_robot_id: Option<RobotId>,
}

// ── telemetry.received ────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReceived {
    pub robot_id: RobotId,
    pub state: RobotState,
    pub x: f64,
    pub y: f64,
    pub battery: f64,
    #[serde(default)]
    pub current_job_id: Option<JobId>,
}

// ── run.completed ─────────────────────────────────────────────────────────────

/// Fleet-level metrics recorded once at run end.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub on_time_rate: f64,
    pub total_distance: f64,
    pub avg_completion_time: f64,
    pub max_lateness: f64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    pub total_jobs: u64,
}

/// Emitted once per run.  A scenario-generation failure produces the
/// `status = "failed"` marker with an `error` string and no metrics.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RunCompleted {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<RunMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Header view ───────────────────────────────────────────────────────────────

/// The run identity repeated in every envelope header.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunIdentity {
    pub run_id: String,
    pub mode: Mode,
    pub seed: u64,
    pub scale: Scale,
}
