//! The per-run tick driver on the simulator side of the bus.

use std::collections::BTreeMap;

use chrono::Utc;
use fleet_bus::{BusConsumer, TopicExchange};
use fleet_core::{FleetConfig, JobId, JobState, RunContext};
use fleet_events::{
    keys, Envelope, EventBody, JobCreated, JobTerminal, RunCompleted, SnapshotTick,
    TelemetryReceived,
};
use fleet_events::payload::RunIdentity;
use fleet_scenario::generate;
use tracing::{info, warn};

use crate::engine::{Assignment, SimEngine};
use crate::error::SimResult;
use crate::metrics::compute_metrics;

// ── Runner ────────────────────────────────────────────────────────────────────

/// Consumes `run.started` and `job.assigned`, owns the engine for the active
/// run, and publishes the whole simulator-side event stream.
///
/// One runner drives one run at a time (multi-run concurrency within a
/// single simulator process is out of scope).
pub struct SimRunner {
    config: FleetConfig,
    exchange: TopicExchange,
    run_started: BusConsumer,
    assignments: BusConsumer,
    active: Option<ActiveRun>,
    finished: bool,
}

struct ActiveRun {
    identity: RunIdentity,
    scenario_hash: String,
    engine: SimEngine,
    last_telemetry_s: Option<u64>,
    prev_job_states: BTreeMap<JobId, JobState>,
}

impl SimRunner {
    /// Bind the simulator's queues on `exchange`.
    pub fn new(config: FleetConfig, exchange: &TopicExchange) -> Self {
        let run_started = exchange.bind("sim.run_started", &[keys::RUN_STARTED]);
        let assignments = exchange.bind("sim.job_assigned", &[keys::JOB_ASSIGNED]);
        Self {
            config,
            exchange: exchange.clone(),
            run_started,
            assignments,
            active: None,
            finished: false,
        }
    }

    /// `true` once the active run has published its `run.completed`.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Read access to the engine of the active run (primarily for tests).
    pub fn engine(&self) -> Option<&SimEngine> {
        self.active.as_ref().map(|a| &a.engine)
    }

    // ── run.started intake ────────────────────────────────────────────────

    /// Drain `run.started` and begin the first valid run.
    ///
    /// Malformed payloads are logged and dropped; a second `run.started`
    /// while a run is active is logged and ignored.
    pub fn poll_start(&mut self) -> SimResult<()> {
        for raw in self.run_started.drain() {
            let envelope = match Envelope::decode(&raw) {
                Ok(env) => env,
                Err(err) => {
                    warn!(%err, "dropping malformed run.started");
                    continue;
                }
            };
            let EventBody::RunStarted(body) = &envelope.body else {
                warn!(key = envelope.routing_key(), "unexpected event on run_started queue");
                continue;
            };
            if self.active.is_some() || self.finished {
                warn!(run_id = %envelope.identity.run_id, "run already active, ignoring run.started");
                continue;
            }

            let mut ctx = RunContext::new(
                envelope.identity.run_id.clone(),
                envelope.identity.mode,
                envelope.identity.seed,
                envelope.identity.scale,
            );
            ctx.robots_override = body.robots;
            ctx.jobs_override = body.jobs;
            self.start(&ctx)?;
        }
        Ok(())
    }

    /// Generate the scenario and publish the startup burst: every
    /// `job.created` in id order, then the initial `robot.updated` sweep.
    ///
    /// A scenario-generation failure publishes the failure-marked
    /// `run.completed` and finishes the run without simulating.
    pub fn start(&mut self, ctx: &RunContext) -> SimResult<()> {
        let identity = RunIdentity {
            run_id: ctx.run_id.clone(),
            mode:   ctx.mode,
            seed:   ctx.seed,
            scale:  ctx.scale,
        };
        info!(run_id = %ctx.run_id, mode = %ctx.mode, seed = ctx.seed, scale = %ctx.scale,
              "sim started");

        let scenario = match generate(&self.config, ctx) {
            Ok(s) => s,
            Err(err) => {
                warn!(run_id = %ctx.run_id, %err, "scenario generation failed");
                self.publish(
                    &identity,
                    0,
                    EventBody::RunCompleted(RunCompleted {
                        scenario_hash: None,
                        metrics:       None,
                        status:        Some("failed".to_owned()),
                        error:         Some(err.to_string()),
                    }),
                )?;
                self.finished = true;
                return Ok(());
            }
        };

        let mut engine = SimEngine::new(&self.config, &scenario);

        for job in &scenario.jobs {
            self.publish(
                &identity,
                0,
                EventBody::JobCreated(JobCreated {
                    job_id:      job.id.clone(),
                    pickup_x:    job.pickup_x,
                    pickup_y:    job.pickup_y,
                    dropoff_x:   job.dropoff_x,
                    dropoff_y:   job.dropoff_y,
                    deadline_ts: job.deadline_ts,
                    priority:    job.priority,
                    state:       job.state,
                }),
            )?;
        }

        engine.emit_initial_updates();
        let prev_job_states = engine
            .jobs()
            .iter()
            .map(|j| (j.id.clone(), j.state))
            .collect();

        self.active = Some(ActiveRun {
            identity,
            scenario_hash: scenario.hash,
            engine,
            last_telemetry_s: None,
            prev_job_states,
        });
        self.flush_robot_updates()?;
        Ok(())
    }

    // ── Tick pump ─────────────────────────────────────────────────────────

    /// Run one tick of the active run.  Returns `false` once the run has
    /// terminated (the terminal events have then been published).
    pub fn pump(&mut self) -> SimResult<bool> {
        let should_stop = match self.active.as_ref() {
            None => return Ok(false),
            Some(run) => run.engine.should_stop(),
        };
        if should_stop {
            self.finish()?;
            return Ok(false);
        }

        self.drain_assignments();

        let sim_time_s = match self.active.as_mut() {
            None => return Ok(false),
            Some(run) => {
                run.engine.step();
                run.engine.sim_time_s()
            }
        };

        self.flush_robot_updates()?;
        self.publish_snapshot(sim_time_s)?;
        self.publish_telemetry(sim_time_s)?;
        self.publish_job_completions(sim_time_s)?;
        Ok(true)
    }

    /// Drain `job.assigned` received since the last tick and apply each.
    fn drain_assignments(&mut self) {
        let raw_messages = self.assignments.drain();
        let Some(run) = self.active.as_mut() else { return };
        for raw in raw_messages {
            let envelope = match Envelope::decode(&raw) {
                Ok(env) => env,
                Err(err) => {
                    warn!(%err, "dropping malformed job.assigned");
                    continue;
                }
            };
            if envelope.identity.run_id != run.identity.run_id {
                continue;
            }
            let EventBody::JobAssigned(body) = envelope.body else {
                warn!(key = envelope.routing_key(), "unexpected event on assignment queue");
                continue;
            };
            run.engine.apply_assignment(&Assignment {
                job_id:          body.job_id,
                robot_id:        body.robot_id,
                idempotency_key: body.idempotency_key,
            });
        }
    }

    // ── Emission ──────────────────────────────────────────────────────────

    fn flush_robot_updates(&mut self) -> SimResult<()> {
        let Some(run) = self.active.as_mut() else { return Ok(()) };
        let identity = run.identity.clone();
        for buffered in run.engine.take_updates() {
            let envelope = Envelope::new(
                identity.clone(),
                buffered.sim_time_s,
                Self::now_ts(),
                EventBody::RobotUpdated(buffered.update),
            );
            self.exchange
                .publish(envelope.routing_key(), &envelope.encode()?);
        }
        Ok(())
    }

    fn publish_snapshot(&mut self, sim_time_s: u64) -> SimResult<()> {
        let Some(run) = self.active.as_ref() else { return Ok(()) };
        let body = EventBody::SnapshotTick(SnapshotTick {
            snapshot: run.engine.snapshot(),
        });
        let identity = run.identity.clone();
        self.publish(&identity, sim_time_s, body)
    }

    /// One `telemetry.received` per robot, once per incremented sim-second.
    fn publish_telemetry(&mut self, sim_time_s: u64) -> SimResult<()> {
        let Some(run) = self.active.as_mut() else { return Ok(()) };
        if run.last_telemetry_s == Some(sim_time_s) {
            return Ok(());
        }
        run.last_telemetry_s = Some(sim_time_s);

        let identity = run.identity.clone();
        let rows: Vec<TelemetryReceived> = run
            .engine
            .robots()
            .iter()
            .map(|r| TelemetryReceived {
                robot_id:       r.id,
                state:          r.state,
                x:              fleet_core::round3(r.position.x),
                y:              fleet_core::round3(r.position.y),
                battery:        fleet_core::round3(r.battery),
                current_job_id: r.current_job_id.clone(),
            })
            .collect();
        for row in rows {
            self.publish(&identity, sim_time_s, EventBody::TelemetryReceived(row))?;
        }
        Ok(())
    }

    /// Publish `job.completed` for every job observed newly completed.
    fn publish_job_completions(&mut self, sim_time_s: u64) -> SimResult<()> {
        let Some(run) = self.active.as_mut() else { return Ok(()) };
        let identity = run.identity.clone();
        let mut completed = Vec::new();
        for job in run.engine.jobs() {
            if run.prev_job_states.get(&job.id) != Some(&job.state) {
                run.prev_job_states.insert(job.id.clone(), job.state);
                if job.state == JobState::Completed {
                    completed.push(JobTerminal {
                        job_id:     job.id.clone(),
                        robot_id:   job.assigned_robot_id,
                        lateness_s: job.lateness_clamped(),
                    });
                }
            }
        }
        for body in completed {
            self.publish(&identity, sim_time_s, EventBody::JobCompleted(body))?;
        }
        Ok(())
    }

    /// Finalize the run: fail leftovers, publish `job.failed` per failed job,
    /// then `run.completed` with the metrics and scenario hash.
    fn finish(&mut self) -> SimResult<()> {
        let Some(mut run) = self.active.take() else { return Ok(()) };
        run.engine.finalize();
        let sim_time_s = run.engine.sim_time_s();

        for job in run.engine.jobs() {
            if job.state == JobState::Failed {
                self.publish(
                    &run.identity,
                    sim_time_s,
                    EventBody::JobFailed(JobTerminal {
                        job_id:     job.id.clone(),
                        robot_id:   job.assigned_robot_id,
                        lateness_s: job.lateness_clamped(),
                    }),
                )?;
            }
        }

        let metrics = compute_metrics(run.engine.jobs(), run.engine.robots());
        info!(run_id = %run.identity.run_id, completed = metrics.completed_jobs,
              failed = metrics.failed_jobs, on_time_rate = metrics.on_time_rate,
              "run completed");
        self.publish(
            &run.identity,
            sim_time_s,
            EventBody::RunCompleted(RunCompleted {
                scenario_hash: Some(run.scenario_hash.clone()),
                metrics:       Some(metrics),
                status:        None,
                error:         None,
            }),
        )?;
        self.finished = true;
        Ok(())
    }

    fn publish(&self, identity: &RunIdentity, sim_time_s: u64, body: EventBody) -> SimResult<()> {
        let envelope = Envelope::new(identity.clone(), sim_time_s, Self::now_ts(), body);
        self.exchange
            .publish(envelope.routing_key(), &envelope.encode()?);
        Ok(())
    }

    /// Wall-clock stamp for the envelope header; informational only, never
    /// part of a determinism contract.
    fn now_ts() -> String {
        Utc::now().to_rfc3339()
    }
}
