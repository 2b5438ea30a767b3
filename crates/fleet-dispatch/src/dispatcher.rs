//! The event-driven dispatcher.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use fleet_bus::{BusConsumer, TopicExchange};
use fleet_core::{FleetConfig, JobId, JobState, Mode, RobotId, RobotState};
use fleet_events::{keys, Envelope, EventBody, JobAssigned, JobCreated, RobotUpdated};
use fleet_optimize::{PlanJob, PlanRequest, PlanRobot, Planner};
use tracing::{debug, info, warn};

use crate::baseline::{compute_baseline_assignments, BASELINE_REASON};
use crate::error::DispatchResult;
use crate::projection::{JobView, RobotView, RunProjection};

/// Reason string carried on GA `job.assigned` events.
const GA_REASON: &str = "ga_planned";

/// Consumes world events, keeps per-run projections and emits `job.assigned`.
///
/// Event handling per run is serialized through `poll()`; the single-flight
/// flag is checked and set inside that serialization, so optimizer triggers
/// coalesce no matter how many events arrive while a replan is outstanding.
pub struct Dispatcher<P: Planner> {
    config: FleetConfig,
    exchange: TopicExchange,
    run_started: BusConsumer,
    job_created: BusConsumer,
    robot_updated: BusConsumer,
    planner: P,
    states: BTreeMap<String, RunProjection>,
}

impl<P: Planner> Dispatcher<P> {
    /// Bind the dispatcher's queues on `exchange`.
    pub fn new(config: FleetConfig, exchange: &TopicExchange, planner: P) -> Self {
        let run_started = exchange.bind("dispatcher.run_started", &[keys::RUN_STARTED]);
        let job_created = exchange.bind("dispatcher.job_created", &[keys::JOB_CREATED]);
        let robot_updated = exchange.bind("dispatcher.robot_updated", &[keys::ROBOT_UPDATED]);
        Self {
            config,
            exchange: exchange.clone(),
            run_started,
            job_created,
            robot_updated,
            planner,
            states: BTreeMap::new(),
        }
    }

    /// Projection for one run (primarily for tests and introspection).
    pub fn projection(&self, run_id: &str) -> Option<&RunProjection> {
        self.states.get(run_id)
    }

    /// Drain and handle everything queued, in stream order per queue:
    /// `run.started`, then `job.created`, then `robot.updated`.
    ///
    /// Malformed payloads are logged and dropped, never requeued.
    pub fn poll(&mut self) -> DispatchResult<()> {
        for raw in self.run_started.drain() {
            match Envelope::decode(&raw) {
                Ok(env) => self.handle_run_started(env)?,
                Err(err) => warn!(%err, "dropping malformed run.started"),
            }
        }
        for raw in self.job_created.drain() {
            match Envelope::decode(&raw) {
                Ok(env) => self.handle_job_created(env),
                Err(err) => warn!(%err, "dropping malformed job.created"),
            }
        }
        for raw in self.robot_updated.drain() {
            match Envelope::decode(&raw) {
                Ok(env) => self.handle_robot_updated(env)?,
                Err(err) => warn!(%err, "dropping malformed robot.updated"),
            }
        }
        Ok(())
    }

    // ── run.started ───────────────────────────────────────────────────────

    fn handle_run_started(&mut self, envelope: Envelope) -> DispatchResult<()> {
        let EventBody::RunStarted(_) = &envelope.body else {
            warn!(key = envelope.routing_key(), "unexpected event on run_started queue");
            return Ok(());
        };
        let run_id = envelope.identity.run_id.clone();
        if run_id.is_empty() {
            warn!("run.started missing run_id");
            return Ok(());
        }
        if self.states.contains_key(&run_id) {
            warn!(%run_id, "run already active");
            return Ok(());
        }

        let mut state = RunProjection::new(
            envelope.identity.clone(),
            self.config.ga_replan_interval_s,
        );
        info!(%run_id, mode = %envelope.identity.mode, seed = envelope.identity.seed,
              scale = %envelope.identity.scale, "run started");

        if envelope.identity.mode == Mode::Ga {
            Self::replan_ga(
                &self.config,
                &self.exchange,
                &self.planner,
                &mut state,
                0,
                "run_start",
            )?;
        }
        self.states.insert(run_id, state);
        Ok(())
    }

    // ── job.created ───────────────────────────────────────────────────────

    fn handle_job_created(&mut self, envelope: Envelope) {
        let Some(state) = self.states.get_mut(&envelope.identity.run_id) else {
            return;
        };
        let EventBody::JobCreated(body) = envelope.body else {
            warn!("unexpected event on job_created queue");
            return;
        };
        let JobCreated {
            job_id,
            pickup_x,
            pickup_y,
            dropoff_x,
            dropoff_y,
            deadline_ts,
            priority,
            state: job_state,
        } = body;
        state.jobs.insert(
            job_id.clone(),
            JobView {
                id: job_id,
                pickup_x,
                pickup_y,
                dropoff_x,
                dropoff_y,
                deadline_ts,
                priority,
                state: job_state,
            },
        );
        // Dispatch is driven by robot.updated events; reacting here would
        // over-assign during the job.created burst at run start.
    }

    // ── robot.updated ─────────────────────────────────────────────────────

    fn handle_robot_updated(&mut self, envelope: Envelope) -> DispatchResult<()> {
        let Some(state) = self.states.get_mut(&envelope.identity.run_id) else {
            return Ok(());
        };
        let EventBody::RobotUpdated(body) = envelope.body else {
            warn!("unexpected event on robot_updated queue");
            return Ok(());
        };
        let sim_time_s = envelope.sim_time_s;
        let RobotUpdated {
            robot_id,
            state: new_state,
            x,
            y,
            speed,
            battery,
            current_job_id,
        } = body;

        // An emitted assignment is "pending" until the simulator confirms it.
        // A stale idle update (no job attached) for such a robot is ignored
        // so we do not double-dispatch.
        if let Some(pending_job) = state.pending_assignments.get(&robot_id).cloned() {
            if current_job_id.as_ref() == Some(&pending_job) || new_state != RobotState::Idle {
                state.pending_assignments.remove(&robot_id);
            } else if current_job_id.is_none() {
                debug!(robot = %robot_id, job = %pending_job,
                       "ignoring idle robot.updated while assignment pending");
                return Ok(());
            }
        }

        let prev = state.robots.get(&robot_id).cloned();
        let prev_state = prev.as_ref().map(|r| r.state);
        let merged = RobotView {
            id: robot_id,
            x: x.unwrap_or_else(|| prev.as_ref().map_or(0.0, |r| r.x)),
            y: y.unwrap_or_else(|| prev.as_ref().map_or(0.0, |r| r.y)),
            speed: speed.unwrap_or_else(|| prev.as_ref().map_or(1.0, |r| r.speed)),
            battery: battery.unwrap_or_else(|| prev.as_ref().map_or(100.0, |r| r.battery)),
            state: new_state,
            current_job_id,
            sim_time_s,
        };
        let robot_battery = merged.battery;
        state.robots.insert(robot_id, merged);

        // An ineligible robot keeps no plan.
        let robot_ok =
            new_state == RobotState::Idle && robot_battery >= self.config.battery_threshold;
        let mut dropped_planned_queue = false;
        if new_state == RobotState::Charging || robot_battery < self.config.battery_threshold {
            if let Some(queue) = state.planned_queues.get_mut(&robot_id) {
                dropped_planned_queue = !queue.is_empty();
                queue.clear();
            }
            state.pending_assignments.remove(&robot_id);
        }

        if state.identity.mode == Mode::Baseline {
            return Self::dispatch_baseline_once_per_second(
                &self.config,
                &self.exchange,
                state,
                sim_time_s,
            );
        }

        // ── GA triggers ───────────────────────────────────────────────────

        Self::emit_planned_for_idle_robot(&self.config, &self.exchange, state, robot_id, sim_time_s)?;

        if self.config.ga_replan_interval_s > 0 {
            if let Some(next) = state.next_periodic_replan_s {
                if sim_time_s >= next && state.has_pending_jobs() && !state.in_flight_optimize {
                    Self::replan_ga(
                        &self.config,
                        &self.exchange,
                        &self.planner,
                        state,
                        sim_time_s,
                        "periodic",
                    )?;
                    let mut next = next;
                    while next <= sim_time_s {
                        next += self.config.ga_replan_interval_s;
                    }
                    state.next_periodic_replan_s = Some(next);
                }
            }
        }

        let transitioned_to_idle =
            prev_state != Some(RobotState::Idle) && new_state == RobotState::Idle;
        let queue_empty = state
            .planned_queues
            .get(&robot_id)
            .is_none_or(|q| q.is_empty());
        if transitioned_to_idle
            && queue_empty
            && state.has_pending_jobs()
            && !state.in_flight_optimize
        {
            Self::replan_ga(
                &self.config,
                &self.exchange,
                &self.planner,
                state,
                sim_time_s,
                "idle_gap",
            )?;
        }

        if !robot_ok
            && dropped_planned_queue
            && state.has_pending_jobs()
            && !state.in_flight_optimize
        {
            Self::replan_ga(
                &self.config,
                &self.exchange,
                &self.planner,
                state,
                sim_time_s,
                "battery_guard",
            )?;
        }
        Ok(())
    }

    // ── Baseline ──────────────────────────────────────────────────────────

    /// The baseline sweep runs at most once per sim-second to avoid flooding
    /// during the per-tick robot.updated stream.
    fn dispatch_baseline_once_per_second(
        config: &FleetConfig,
        exchange: &TopicExchange,
        state: &mut RunProjection,
        sim_time_s: u64,
    ) -> DispatchResult<()> {
        if state.last_baseline_dispatch_s == Some(sim_time_s) {
            return Ok(());
        }
        state.last_baseline_dispatch_s = Some(sim_time_s);

        let blocked: BTreeSet<RobotId> = state.pending_assignments.keys().copied().collect();
        let assignments = compute_baseline_assignments(
            &state.robots,
            &state.jobs,
            &state.assigned,
            &blocked,
            config.battery_threshold,
        );
        for assignment in assignments {
            Self::emit_assignment(
                exchange,
                state,
                assignment.job_id,
                assignment.robot_id,
                sim_time_s,
                BASELINE_REASON,
            )?;
        }
        Ok(())
    }

    // ── GA replan ─────────────────────────────────────────────────────────

    /// Snapshot the projection, call the planner, rebuild planned queues and
    /// hand jobs to currently idle robots.
    ///
    /// Single-flight: a replan entered while another is outstanding returns
    /// immediately.  Planner failure clears the flag and waits for the next
    /// trigger — no baseline fallback in GA mode.
    fn replan_ga(
        config: &FleetConfig,
        exchange: &TopicExchange,
        planner: &P,
        state: &mut RunProjection,
        sim_time_s: u64,
        reason: &str,
    ) -> DispatchResult<()> {
        if state.in_flight_optimize {
            return Ok(());
        }
        state.in_flight_optimize = true;

        let pending_jobs: Vec<PlanJob> = state
            .pending_jobs()
            .into_iter()
            .map(|j| PlanJob {
                id: j.id.clone(),
                pickup_x: j.pickup_x,
                pickup_y: j.pickup_y,
                dropoff_x: j.dropoff_x,
                dropoff_y: j.dropoff_y,
                deadline_ts: j.deadline_ts,
                priority: j.priority,
            })
            .collect();
        let robots: Vec<PlanRobot> = state
            .eligible_robots(config.battery_threshold)
            .into_iter()
            .map(|r| PlanRobot {
                id: r.id,
                x: r.x,
                y: r.y,
                speed: r.speed,
                battery: r.battery,
                state: r.state,
            })
            .collect();
        if pending_jobs.is_empty() || robots.is_empty() {
            state.in_flight_optimize = false;
            return Ok(());
        }

        let request = PlanRequest {
            run_id: state.identity.run_id.clone(),
            seed: state.identity.seed,
            mode: state.identity.mode,
            sim_time_s,
            robots,
            pending_jobs,
        };
        let response = match planner.plan(&request) {
            Ok(response) => response,
            Err(err) => {
                warn!(run_id = %state.identity.run_id, reason, %err, "ga replan failed");
                state.in_flight_optimize = false;
                return Ok(());
            }
        };

        // Whole-fleet plan: rebuild every eligible robot's queue, skipping
        // whatever stopped being assignable while the plan was computed.
        let mut new_queues: BTreeMap<RobotId, Vec<JobId>> =
            request.robots.iter().map(|r| (r.id, Vec::new())).collect();
        for assignment in &response.assignments {
            if state.assigned.contains(&assignment.job_id) {
                continue;
            }
            let Some(job) = state.jobs.get(&assignment.job_id) else {
                continue;
            };
            if !job.state.is_assignable() {
                continue;
            }
            let Some(queue) = new_queues.get_mut(&assignment.robot_id) else {
                continue;
            };
            if !queue.contains(&assignment.job_id) {
                queue.push(assignment.job_id.clone());
            }
        }
        state.planned_queues = new_queues;
        info!(run_id = %state.identity.run_id, reason, sim_time_s,
              pending = request.pending_jobs.len(), best_score = response.meta.best_score,
              "ga replan");

        let result = Self::emit_planned_for_idle_robots(config, exchange, state, sim_time_s);
        state.in_flight_optimize = false;
        result
    }

    fn emit_planned_for_idle_robots(
        config: &FleetConfig,
        exchange: &TopicExchange,
        state: &mut RunProjection,
        sim_time_s: u64,
    ) -> DispatchResult<()> {
        let robot_ids: Vec<RobotId> = state.robots.keys().copied().collect();
        for robot_id in robot_ids {
            Self::emit_planned_for_idle_robot(config, exchange, state, robot_id, sim_time_s)?;
        }
        Ok(())
    }

    /// Hand the next planned job to `robot_id` if it is idle and eligible.
    fn emit_planned_for_idle_robot(
        config: &FleetConfig,
        exchange: &TopicExchange,
        state: &mut RunProjection,
        robot_id: RobotId,
        sim_time_s: u64,
    ) -> DispatchResult<()> {
        let Some(robot) = state.robots.get(&robot_id) else {
            return Ok(());
        };
        if robot.state != RobotState::Idle || robot.battery < config.battery_threshold {
            return Ok(());
        }

        loop {
            let next = state
                .planned_queues
                .get_mut(&robot_id)
                .and_then(|queue| (!queue.is_empty()).then(|| queue.remove(0)));
            let Some(job_id) = next else {
                return Ok(());
            };
            let assignable = state
                .jobs
                .get(&job_id)
                .is_some_and(|j| j.state.is_assignable())
                && !state.assigned.contains(&job_id);
            if assignable {
                return Self::emit_assignment(exchange, state, job_id, robot_id, sim_time_s, GA_REASON);
            }
        }
    }

    // ── Assignment emission ───────────────────────────────────────────────

    fn emit_assignment(
        exchange: &TopicExchange,
        state: &mut RunProjection,
        job_id: JobId,
        robot_id: RobotId,
        sim_time_s: u64,
        reason: &str,
    ) -> DispatchResult<()> {
        if state.assigned.contains(&job_id) {
            return Ok(());
        }
        let Some(job) = state.jobs.get(&job_id) else {
            return Ok(());
        };
        if !job.state.is_assignable() {
            return Ok(());
        }

        let envelope = Envelope::new(
            state.identity.clone(),
            sim_time_s,
            Utc::now().to_rfc3339(),
            EventBody::JobAssigned(JobAssigned {
                job_id: job_id.clone(),
                robot_id,
                reason: reason.to_owned(),
                idempotency_key: format!("{}:{}", state.identity.run_id, job_id),
            }),
        );
        exchange.publish(envelope.routing_key(), &envelope.encode()?);

        // Optimistic projection update; the simulator remains authoritative.
        state.assigned.insert(job_id.clone());
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.state = JobState::Assigned;
        }
        if let Some(robot) = state.robots.get_mut(&robot_id) {
            robot.state = RobotState::MovingToPickup;
            robot.current_job_id = Some(job_id.clone());
        }
        state.pending_assignments.insert(robot_id, job_id.clone());
        info!(run_id = %state.identity.run_id, %job_id, %robot_id, reason,
              "assignment emitted");
        Ok(())
    }
}
