//! The simulation engine: per-tick kinematics, battery and state transitions.

use std::collections::{BTreeMap, HashSet};

use fleet_core::{round3, FleetConfig, JobId, JobState, RobotId, RobotState, SimClock};
use fleet_events::{RobotUpdated, Snapshot, SnapshotJob, SnapshotRobot};
use fleet_scenario::Scenario;
use tracing::{debug, warn};

use crate::entities::{Job, Robot};

// ── Assignment commands ───────────────────────────────────────────────────────

/// A `job.assigned` command as the engine consumes it.
#[derive(Clone, Debug)]
pub struct Assignment {
    pub job_id: JobId,
    pub robot_id: RobotId,
    pub idempotency_key: String,
}

/// What happened to one inbound assignment command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Materialised: job is now `assigned`, robot heads to pickup.
    Applied,
    /// Same idempotency key as an already-applied command; dropped silently.
    Duplicate,
    /// Unknown entity or wrong state; logged and ignored.
    Rejected,
}

/// A robot update buffered by the engine, flushed to the bus by the runner.
#[derive(Clone, Debug)]
pub struct BufferedUpdate {
    pub sim_time_s: u64,
    pub update: RobotUpdated,
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Authoritative state for one run.
///
/// The engine owns the world truth; everything else (dispatcher, viewers)
/// holds projections built from the events the runner publishes.
pub struct SimEngine {
    clock: SimClock,
    service_time_s: f64,
    max_sim_seconds: u64,
    charge_rate: f64,
    charge_resume_threshold: f64,
    battery_drain_per_s: f64,

    robots: Vec<Robot>,
    jobs: Vec<Job>,
    job_index: BTreeMap<JobId, usize>,
    robot_index: BTreeMap<RobotId, usize>,

    /// Idempotency keys of applied assignments.
    applied_keys: HashSet<String>,
    /// Movement state to restore when a depleted robot finishes charging.
    resume_state: BTreeMap<RobotId, RobotState>,
    /// Per-robot sim-second of the last position-only emission.
    last_position_emit_s: BTreeMap<RobotId, u64>,

    pending_updates: Vec<BufferedUpdate>,
}

impl SimEngine {
    pub fn new(config: &FleetConfig, scenario: &Scenario) -> Self {
        let robots: Vec<Robot> = scenario.robots.iter().map(Robot::from_spec).collect();
        let jobs: Vec<Job> = scenario.jobs.iter().map(Job::from_spec).collect();
        let robot_index = robots.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        let job_index = jobs.iter().enumerate().map(|(i, j)| (j.id.clone(), i)).collect();

        Self {
            clock:                   SimClock::new(config.sim_tick_hz),
            service_time_s:          config.service_time_s as f64,
            max_sim_seconds:         config.max_sim_seconds,
            charge_rate:             config.charge_rate,
            charge_resume_threshold: config.charge_resume_threshold,
            battery_drain_per_s:     config.battery_drain_per_s,
            robots,
            jobs,
            job_index,
            robot_index,
            applied_keys:            HashSet::new(),
            resume_state:            BTreeMap::new(),
            last_position_emit_s:    BTreeMap::new(),
            pending_updates:         Vec::new(),
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn sim_time_s(&self) -> u64 {
        self.clock.sim_time_s()
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Drain the buffered `robot.updated` emissions.
    pub fn take_updates(&mut self) -> Vec<BufferedUpdate> {
        std::mem::take(&mut self.pending_updates)
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Buffer a forced `robot.updated` for every robot — the initial burst
    /// published at run start, before any tick.
    pub fn emit_initial_updates(&mut self) {
        let now = self.sim_time_s();
        for i in 0..self.robots.len() {
            self.emit_robot_update(i, now, true);
        }
    }

    /// Apply one `job.assigned` command.
    ///
    /// Only materialises when the job is still assignable and the robot is
    /// idle; the dispatcher's projection may be stale, in which case the
    /// command is simply ignored here.
    pub fn apply_assignment(&mut self, assignment: &Assignment) -> ApplyOutcome {
        if self.applied_keys.contains(&assignment.idempotency_key) {
            debug!(key = %assignment.idempotency_key, "duplicate assignment dropped");
            return ApplyOutcome::Duplicate;
        }

        let Some(&robot_idx) = self.robot_index.get(&assignment.robot_id) else {
            warn!(robot = %assignment.robot_id, job = %assignment.job_id,
                  "assignment rejected: unknown robot");
            return ApplyOutcome::Rejected;
        };
        let Some(&job_idx) = self.job_index.get(&assignment.job_id) else {
            warn!(robot = %assignment.robot_id, job = %assignment.job_id,
                  "assignment rejected: unknown job");
            return ApplyOutcome::Rejected;
        };

        let job_state = self.jobs[job_idx].state;
        if !job_state.is_assignable() {
            warn!(job = %assignment.job_id, state = %job_state,
                  "assignment rejected: job not assignable");
            return ApplyOutcome::Rejected;
        }
        if self.robots[robot_idx].state != RobotState::Idle {
            warn!(robot = %assignment.robot_id, state = %self.robots[robot_idx].state,
                  "assignment rejected: robot not idle");
            return ApplyOutcome::Rejected;
        }

        let now = self.sim_time_s();
        {
            let job = &mut self.jobs[job_idx];
            job.state = JobState::Assigned;
            job.assigned_robot_id = Some(assignment.robot_id);
            job.started_sim_ts = Some(now);
        }
        let pickup = self.jobs[job_idx].pickup;
        {
            let robot = &mut self.robots[robot_idx];
            robot.current_job_id = Some(assignment.job_id.clone());
            robot.target = Some(pickup);
            robot.service_remaining_s = 0.0;
            robot.state = RobotState::MovingToPickup;
        }
        self.applied_keys.insert(assignment.idempotency_key.clone());
        self.emit_robot_update(robot_idx, now, true);
        ApplyOutcome::Applied
    }

    /// Advance the world by one tick: every robot in id order, then the clock.
    pub fn step(&mut self) {
        let now = self.sim_time_s();
        for i in 0..self.robots.len() {
            let prev = self.robots[i].state;
            self.advance_robot(i);
            if self.robots[i].state != prev {
                self.emit_robot_update(i, now, true);
            } else {
                self.emit_robot_update(i, now, false);
            }
        }
        self.clock.advance();
    }

    /// `true` once the time budget is exhausted or every job is terminal.
    pub fn should_stop(&self) -> bool {
        if self.sim_time_s() >= self.max_sim_seconds {
            return true;
        }
        self.jobs.iter().all(|j| j.state.is_terminal())
    }

    /// Fail whatever is still non-terminal at end of run, recording lateness.
    pub fn finalize(&mut self) {
        let now = self.sim_time_s();
        for job in &mut self.jobs {
            if !job.state.is_terminal() {
                job.state = JobState::Failed;
                job.completed_sim_ts = Some(now);
                job.lateness_s = now as f64 - job.deadline_ts as f64;
            }
        }
    }

    /// Full world view for `snapshot.tick`: robots then jobs, each id order.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            robots: self
                .robots
                .iter()
                .map(|r| SnapshotRobot {
                    id:             r.id,
                    x:              round3(r.position.x),
                    y:              round3(r.position.y),
                    speed:          r.speed,
                    battery:        round3(r.battery),
                    state:          r.state,
                    current_job_id: r.current_job_id.clone(),
                })
                .collect(),
            jobs: self
                .jobs
                .iter()
                .map(|j| SnapshotJob {
                    id:                j.id.clone(),
                    pickup_x:          j.pickup.x,
                    pickup_y:          j.pickup.y,
                    dropoff_x:         j.dropoff.x,
                    dropoff_y:         j.dropoff.y,
                    deadline_ts:       j.deadline_ts,
                    priority:          j.priority,
                    state:             j.state,
                    assigned_robot_id: j.assigned_robot_id,
                })
                .collect(),
        }
    }

    // ── Per-robot advance ─────────────────────────────────────────────────

    fn advance_robot(&mut self, i: usize) {
        let dt = self.clock.dt();

        match self.robots[i].state {
            RobotState::Charging => {
                let robot = &mut self.robots[i];
                robot.battery = (robot.battery + self.charge_rate * dt).min(100.0);
                if robot.battery >= self.charge_resume_threshold {
                    let resumed = self
                        .resume_state
                        .remove(&robot.id)
                        .unwrap_or(RobotState::Idle);
                    robot.state = resumed;
                }
            }

            RobotState::Idle => {}

            RobotState::Servicing => {
                if self.drain_battery(i, dt) {
                    // Countdown untouched; servicing resumes where it paused.
                    self.pause_for_charging(i, RobotState::Servicing);
                    return;
                }
                let robot = &mut self.robots[i];
                robot.service_remaining_s = (robot.service_remaining_s - dt).max(0.0);
                if robot.service_remaining_s > 0.0 {
                    return;
                }
                // Service done: the job is now physically in progress.
                let Some(job_idx) = robot
                    .current_job_id
                    .as_ref()
                    .and_then(|id| self.job_index.get(id).copied())
                else {
                    self.robots[i].clear_job();
                    return;
                };
                self.jobs[job_idx].state = JobState::InProgress;
                let dropoff = self.jobs[job_idx].dropoff;
                let robot = &mut self.robots[i];
                robot.target = Some(dropoff);
                robot.state = RobotState::MovingToDropoff;
            }

            RobotState::MovingToPickup | RobotState::MovingToDropoff => {
                self.advance_moving_robot(i, dt);
            }
        }
    }

    fn advance_moving_robot(&mut self, i: usize, dt: f64) {
        let state = self.robots[i].state;

        if self.drain_battery(i, dt) {
            self.pause_for_charging(i, state);
            return;
        }

        let job_idx = self.robots[i]
            .current_job_id
            .as_ref()
            .and_then(|id| self.job_index.get(id).copied());
        let Some(job_idx) = job_idx else {
            // Inconsistent movement state with no job attached.
            self.robots[i].clear_job();
            return;
        };
        let Some(target) = self.robots[i].target else {
            self.robots[i].clear_job();
            return;
        };

        let robot = &mut self.robots[i];
        let distance_to_target = robot.position.distance(target);
        let step_distance = robot.speed * dt;

        if distance_to_target > 0.0 {
            let travel = distance_to_target.min(step_distance);
            let ratio = travel / distance_to_target;
            robot.position.x += (target.x - robot.position.x) * ratio;
            robot.position.y += (target.y - robot.position.y) * ratio;
            robot.distance_traveled += travel;
        }

        if distance_to_target > step_distance + 1e-9 {
            return;
        }
        // Arrived: snap to the waypoint.
        self.robots[i].position = target;

        match state {
            RobotState::MovingToPickup => {
                let robot = &mut self.robots[i];
                robot.service_remaining_s = self.service_time_s;
                robot.state = RobotState::Servicing;
            }
            RobotState::MovingToDropoff => {
                let now = self.sim_time_s();
                {
                    let job = &mut self.jobs[job_idx];
                    job.state = JobState::Completed;
                    job.completed_sim_ts = Some(now);
                    job.lateness_s = now as f64 - job.deadline_ts as f64;
                }
                self.robots[i].clear_job();
            }
            _ => unreachable!("advance_moving_robot only sees movement states"),
        }
    }

    /// Apply the fixed per-tick drain to a non-idle, non-charging robot.
    /// Returns `true` when the battery has depleted (clamped to 0).
    fn drain_battery(&mut self, i: usize, dt: f64) -> bool {
        let robot = &mut self.robots[i];
        robot.battery = (robot.battery - self.battery_drain_per_s * dt).max(0.0);
        robot.battery <= 0.0
    }

    /// Battery depleted mid-task: pause the active state, charge.  The
    /// paused state (and any servicing countdown) is restored on resume.
    fn pause_for_charging(&mut self, i: usize, paused: RobotState) {
        let robot = &mut self.robots[i];
        robot.battery = robot.battery.max(0.0);
        self.resume_state.insert(robot.id, paused);
        robot.state = RobotState::Charging;
    }

    // ── Emission ──────────────────────────────────────────────────────────

    /// Buffer a `robot.updated`.  Forced on transitions; otherwise a
    /// position-only update throttled to at most once per sim-second.
    fn emit_robot_update(&mut self, i: usize, sim_time_s: u64, force: bool) {
        let robot = &self.robots[i];
        if !force {
            if let Some(&last) = self.last_position_emit_s.get(&robot.id) {
                if sim_time_s <= last {
                    return;
                }
            }
        }
        self.pending_updates.push(BufferedUpdate {
            sim_time_s,
            update: RobotUpdated {
                robot_id:       robot.id,
                state:          robot.state,
                x:              Some(round3(robot.position.x)),
                y:              Some(round3(robot.position.y)),
                speed:          Some(robot.speed),
                battery:        Some(round3(robot.battery)),
                current_job_id: robot.current_job_id.clone(),
            },
        });
        self.last_position_emit_s.insert(robot.id, sim_time_s);
    }
}
