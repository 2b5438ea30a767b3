//! `fleet-events` — the JSON wire contract of the fleet event bus.
//!
//! Every message on the bus is an [`Envelope`]: a fixed header
//! (`event_id`, `run_id`, `mode`, `seed`, `scale`, `sim_time_s`, `ts_utc`)
//! plus one typed [`EventBody`].  The body enum is internally tagged with
//! `event_type`, whose value doubles as the routing key, so the JSON is flat:
//!
//! ```json
//! {"event_id":"…","event_type":"job.assigned","run_id":"run-1","mode":"ga",
//!  "seed":42,"scale":"mini","sim_time_s":12,"ts_utc":"…",
//!  "job_id":"job_3","robot_id":2,"reason":"ga_planned",
//!  "idempotency_key":"run-1:job_3"}
//! ```
//!
//! `ts_utc` is informational for external consumers and excluded from every
//! determinism contract.  `event_id` is a Sha256 digest of
//! `run_id:event_type:entity:sim_time_s` — stable across replays.

pub mod envelope;
pub mod payload;


pub use envelope::{event_id, Envelope, EventError, EventResult};
pub use payload::{
    EventBody, JobAssigned, JobCreated, JobTerminal, RobotUpdated, RunCompleted, RunIdentity,
    RunMetrics, RunStarted, Snapshot, SnapshotJob, SnapshotRobot, SnapshotTick, TelemetryReceived,
};

/// Routing keys, one per event type.
pub mod keys {
    pub const RUN_STARTED: &str = "run.started";
    pub const JOB_CREATED: &str = "job.created";
    pub const ROBOT_UPDATED: &str = "robot.updated";
    pub const JOB_ASSIGNED: &str = "job.assigned";
    pub const JOB_COMPLETED: &str = "job.completed";
    pub const JOB_FAILED: &str = "job.failed";
    pub const SNAPSHOT_TICK: &str = "snapshot.tick";
    pub const TELEMETRY_RECEIVED: &str = "telemetry.received";
    pub const RUN_COMPLETED: &str = "run.completed";
}
