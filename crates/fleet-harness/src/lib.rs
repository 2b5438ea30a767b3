//! `fleet-harness` — one run, one process, pumped to completion.
//!
//! The production topology runs the simulator, dispatcher and optimizer as
//! separate bus-connected services; this crate collapses that topology into
//! a single deterministic loop so that whole runs can be executed inside a
//! test or a CLI:
//!
//! ```text
//! inject run.started
//! runner.poll_start()          // scenario, job.created burst, robot burst
//! dispatcher.poll()
//! while runner.pump():         // one tick: apply → advance → emit
//!     dispatcher.poll()        // project events, decide, emit job.assigned
//! collect run.completed
//! ```
//!
//! The pump order preserves the contract guarantees: per-producer FIFO,
//! apply-on-next-tick assignment intake, and the dispatcher's single-flight
//! optimizer calls serialized inside `poll()`.

use chrono::Utc;
use fleet_bus::TopicExchange;
use fleet_core::{FleetConfig, RunContext};
use fleet_dispatch::{DispatchError, Dispatcher};
use fleet_events::payload::RunIdentity;
use fleet_events::{keys, Envelope, EventBody, EventError, RunMetrics, RunStarted};
use fleet_optimize::GaPlanner;
use fleet_sim::{SimError, SimRunner};
use thiserror::Error;
use tracing::info;

#[cfg(test)]
mod tests;

// ── Report ────────────────────────────────────────────────────────────────────

/// What the external observer saw for one run.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: String,
    pub scenario_hash: Option<String>,
    pub metrics: Option<RunMetrics>,
    /// `Some("failed")` when the run was rejected at scenario time.
    pub status: Option<String>,
    pub error: Option<String>,
    /// `job.assigned` events observed on the bus.
    pub assignments: u64,
    /// `snapshot.tick` events observed on the bus.
    pub snapshots: u64,
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("run {0} never published run.completed")]
    MissingCompletion(String),

    #[error("run {0} exceeded the tick bound without terminating")]
    Stalled(String),
}

pub type HarnessResult<T> = Result<T, HarnessError>;

// ── Entry point ───────────────────────────────────────────────────────────────

/// Execute one run to completion and return the observer's report.
///
/// Fully deterministic for a given `(config, ctx)`: repeated calls produce
/// identical scenario hashes and metrics.
pub fn run_once(config: &FleetConfig, ctx: &RunContext) -> HarnessResult<RunReport> {
    let bus = TopicExchange::new("amr.events");

    let mut runner = SimRunner::new(config.clone(), &bus);
    let planner = GaPlanner::new(config.clone());
    let mut dispatcher = Dispatcher::new(config.clone(), &bus, planner);

    let completed = bus.bind("harness.run_completed", &[keys::RUN_COMPLETED]);
    let assigned = bus.bind("harness.job_assigned", &[keys::JOB_ASSIGNED]);
    let snapshots = bus.bind("harness.snapshot_tick", &[keys::SNAPSHOT_TICK]);

    // Inject the boundary event that fans out to simulator and dispatcher.
    let identity = RunIdentity {
        run_id: ctx.run_id.clone(),
        mode:   ctx.mode,
        seed:   ctx.seed,
        scale:  ctx.scale,
    };
    let start = Envelope::new(
        identity,
        0,
        Utc::now().to_rfc3339(),
        EventBody::RunStarted(RunStarted {
            robots: ctx.robots_override,
            jobs:   ctx.jobs_override,
        }),
    );
    bus.publish(start.routing_key(), &start.encode()?);

    runner.poll_start()?;
    dispatcher.poll()?;

    // Generous bound: every simulated tick plus startup slack.
    let tick_bound = config.max_sim_seconds * config.sim_tick_hz.max(1) as u64 + 16;
    let mut ticks = 0u64;
    let mut assignments = 0u64;
    let mut snapshot_count = 0u64;
    while runner.pump()? {
        dispatcher.poll()?;
        assignments += assigned.drain().len() as u64;
        snapshot_count += snapshots.drain().len() as u64;
        ticks += 1;
        if ticks > tick_bound {
            return Err(HarnessError::Stalled(ctx.run_id.clone()));
        }
    }
    assignments += assigned.drain().len() as u64;
    snapshot_count += snapshots.drain().len() as u64;

    for raw in completed.drain() {
        let envelope = Envelope::decode(&raw)?;
        if envelope.identity.run_id != ctx.run_id {
            continue;
        }
        let EventBody::RunCompleted(body) = envelope.body else {
            continue;
        };
        info!(run_id = %ctx.run_id, ticks, assignments, "run pumped to completion");
        return Ok(RunReport {
            run_id:        ctx.run_id.clone(),
            scenario_hash: body.scenario_hash,
            metrics:       body.metrics,
            status:        body.status,
            error:         body.error,
            assignments,
            snapshots:     snapshot_count,
        });
    }
    Err(HarnessError::MissingCompletion(ctx.run_id.clone()))
}
