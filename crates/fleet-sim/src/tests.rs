//! Engine and runner tests.

use fleet_core::{FleetConfig, JobId, JobState, Mode, RobotId, RobotState, Scale};
use fleet_scenario::{JobSpec, RobotSpec, Scenario};

use crate::engine::{ApplyOutcome, Assignment, SimEngine};
use crate::entities::{Job, Robot};
use crate::metrics::compute_metrics;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn test_config() -> FleetConfig {
    FleetConfig {
        sim_tick_hz: 5,
        service_time_s: 5,
        max_sim_seconds: 600,
        ..FleetConfig::default()
    }
}

fn robot_spec(id: u32, x: f64, y: f64, speed: f64) -> RobotSpec {
    RobotSpec {
        id: RobotId(id),
        x,
        y,
        speed,
        battery: 100.0,
        state: RobotState::Idle,
    }
}

fn job_spec(n: usize, pickup: (f64, f64), dropoff: (f64, f64), deadline_ts: u64) -> JobSpec {
    JobSpec {
        id: JobId::nth(n),
        pickup_x: pickup.0,
        pickup_y: pickup.1,
        dropoff_x: dropoff.0,
        dropoff_y: dropoff.1,
        deadline_ts,
        priority: 3,
        state: JobState::Pending,
    }
}

fn scenario(robots: Vec<RobotSpec>, jobs: Vec<JobSpec>) -> Scenario {
    Scenario {
        robots,
        jobs,
        hash: "test".to_owned(),
    }
}

fn assign(engine: &mut SimEngine, job: usize, robot: u32) -> ApplyOutcome {
    engine.apply_assignment(&Assignment {
        job_id: JobId::nth(job),
        robot_id: RobotId(robot),
        idempotency_key: format!("run-test:job_{job}"),
    })
}

/// Step until the predicate holds or `max_ticks` elapse.
fn step_until(engine: &mut SimEngine, max_ticks: u64, mut done: impl FnMut(&SimEngine) -> bool) {
    for _ in 0..max_ticks {
        if done(engine) {
            return;
        }
        engine.step();
    }
    assert!(done(engine), "condition not reached within {max_ticks} ticks");
}

// ── Assignment handling ───────────────────────────────────────────────────────

#[cfg(test)]
mod assignment {
    use super::*;

    #[test]
    fn applied_assignment_starts_pickup_leg() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0)],
            vec![job_spec(1, (2.0, 0.0), (4.0, 0.0), 100)],
        );
        let mut engine = SimEngine::new(&config, &s);

        assert_eq!(assign(&mut engine, 1, 1), ApplyOutcome::Applied);
        let robot = &engine.robots()[0];
        assert_eq!(robot.state, RobotState::MovingToPickup);
        assert_eq!(robot.current_job_id, Some(JobId::nth(1)));
        let job = &engine.jobs()[0];
        assert_eq!(job.state, JobState::Assigned);
        assert_eq!(job.assigned_robot_id, Some(RobotId(1)));
        assert_eq!(job.started_sim_ts, Some(0));
    }

    #[test]
    fn duplicate_idempotency_key_is_dropped() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0), robot_spec(2, 5.0, 5.0, 1.0)],
            vec![job_spec(1, (2.0, 0.0), (4.0, 0.0), 100)],
        );
        let mut engine = SimEngine::new(&config, &s);

        assert_eq!(assign(&mut engine, 1, 1), ApplyOutcome::Applied);
        let robot_state_after_first = engine.robots()[0].state;

        // Same key again — even naming a different robot — is a no-op.
        let outcome = engine.apply_assignment(&Assignment {
            job_id: JobId::nth(1),
            robot_id: RobotId(2),
            idempotency_key: "run-test:job_1".to_owned(),
        });
        assert_eq!(outcome, ApplyOutcome::Duplicate);
        assert_eq!(engine.robots()[0].state, robot_state_after_first);
        assert_eq!(engine.robots()[1].state, RobotState::Idle);
    }

    #[test]
    fn reassignment_of_taken_job_rejected() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0), robot_spec(2, 1.0, 1.0, 1.0)],
            vec![job_spec(1, (2.0, 0.0), (4.0, 0.0), 100)],
        );
        let mut engine = SimEngine::new(&config, &s);
        assert_eq!(assign(&mut engine, 1, 1), ApplyOutcome::Applied);

        let outcome = engine.apply_assignment(&Assignment {
            job_id: JobId::nth(1),
            robot_id: RobotId(2),
            idempotency_key: "run-test:job_1:retry".to_owned(),
        });
        assert_eq!(outcome, ApplyOutcome::Rejected);
        assert_eq!(engine.robots()[1].state, RobotState::Idle);
    }

    #[test]
    fn unknown_entities_rejected() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0)],
            vec![job_spec(1, (2.0, 0.0), (4.0, 0.0), 100)],
        );
        let mut engine = SimEngine::new(&config, &s);

        let bad_robot = engine.apply_assignment(&Assignment {
            job_id: JobId::nth(1),
            robot_id: RobotId(9),
            idempotency_key: "k1".to_owned(),
        });
        assert_eq!(bad_robot, ApplyOutcome::Rejected);

        let bad_job = engine.apply_assignment(&Assignment {
            job_id: JobId::nth(9),
            robot_id: RobotId(1),
            idempotency_key: "k2".to_owned(),
        });
        assert_eq!(bad_job, ApplyOutcome::Rejected);
    }

    #[test]
    fn busy_robot_rejected() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0)],
            vec![
                job_spec(1, (2.0, 0.0), (4.0, 0.0), 100),
                job_spec(2, (3.0, 0.0), (5.0, 0.0), 100),
            ],
        );
        let mut engine = SimEngine::new(&config, &s);
        assert_eq!(assign(&mut engine, 1, 1), ApplyOutcome::Applied);
        assert_eq!(assign(&mut engine, 2, 1), ApplyOutcome::Rejected);
        assert_eq!(engine.jobs()[1].state, JobState::Pending);
    }
}

// ── Job lifecycle ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod lifecycle {
    use super::*;

    #[test]
    fn pickup_service_dropoff_completes_job() {
        let config = test_config();
        // 1 unit to pickup (5 ticks at speed 1), 5 s service (25 ticks),
        // 1 unit to dropoff (5 ticks).
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0)],
            vec![job_spec(1, (1.0, 0.0), (2.0, 0.0), 100)],
        );
        let mut engine = SimEngine::new(&config, &s);
        assign(&mut engine, 1, 1);

        step_until(&mut engine, 10, |e| e.robots()[0].state == RobotState::Servicing);
        assert_eq!(engine.jobs()[0].state, JobState::Assigned, "still assigned while servicing");
        assert_eq!(engine.robots()[0].position.x, 1.0, "snapped to pickup");

        step_until(&mut engine, 40, |e| {
            e.robots()[0].state == RobotState::MovingToDropoff
        });
        assert_eq!(engine.jobs()[0].state, JobState::InProgress);

        step_until(&mut engine, 20, |e| e.jobs()[0].state == JobState::Completed);
        let job = &engine.jobs()[0];
        assert!(job.completed_sim_ts.is_some());
        assert!(job.lateness_s < 0.0, "completed well before deadline");
        assert_eq!(engine.robots()[0].state, RobotState::Idle);
        assert!(engine.robots()[0].current_job_id.is_none());
    }

    #[test]
    fn past_deadline_job_is_not_failed_mid_run() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0)],
            vec![job_spec(1, (50.0, 0.0), (60.0, 0.0), 1)], // deadline 1 s, far away
        );
        let mut engine = SimEngine::new(&config, &s);
        assign(&mut engine, 1, 1);

        for _ in 0..50 {
            engine.step();
        }
        assert!(engine.sim_time_s() > 1);
        assert!(
            !engine.jobs()[0].state.is_terminal(),
            "deadline passage must not fail a job mid-run"
        );

        step_until(&mut engine, 5_000, |e| e.jobs()[0].state == JobState::Completed);
        assert!(engine.jobs()[0].lateness_s > 0.0, "lateness recorded on completion");
    }

    #[test]
    fn finalize_fails_leftovers_with_lateness() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0)],
            vec![
                job_spec(1, (1.0, 0.0), (2.0, 0.0), 100),
                job_spec(2, (9.0, 9.0), (1.0, 1.0), 3),
            ],
        );
        let mut engine = SimEngine::new(&config, &s);
        for _ in 0..25 {
            engine.step(); // 5 s elapse; nothing assigned
        }
        engine.finalize();
        for job in engine.jobs() {
            assert_eq!(job.state, JobState::Failed);
            assert_eq!(job.completed_sim_ts, Some(5));
        }
        assert_eq!(engine.jobs()[1].lateness_s, 2.0, "5 s end − 3 s deadline");
    }

    #[test]
    fn stops_at_max_sim_seconds() {
        let mut config = test_config();
        config.max_sim_seconds = 2;
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0)],
            vec![job_spec(1, (90.0, 90.0), (1.0, 1.0), 100)],
        );
        let mut engine = SimEngine::new(&config, &s);
        assert!(!engine.should_stop());
        for _ in 0..10 {
            engine.step();
        }
        assert_eq!(engine.sim_time_s(), 2);
        assert!(engine.should_stop());
    }

    #[test]
    fn stops_when_all_jobs_terminal() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 2.0)],
            vec![job_spec(1, (0.0, 0.0), (0.5, 0.0), 100)],
        );
        let mut engine = SimEngine::new(&config, &s);
        assign(&mut engine, 1, 1);
        step_until(&mut engine, 200, |e| e.jobs()[0].state == JobState::Completed);
        assert!(engine.should_stop());
    }
}

// ── Battery & charging ────────────────────────────────────────────────────────

#[cfg(test)]
mod battery {
    use super::*;

    #[test]
    fn depleted_robot_charges_and_resumes_job() {
        // Spec scenario F, depleting on the dropoff leg: the 1 s pickup leg
        // drains 0.5, the 5 s service drains 2.5, so 3.2 % runs out shortly
        // after the dropoff leg begins.
        let mut config = test_config();
        config.battery_drain_per_s = 0.5;
        config.charge_rate = 5.0;
        config.charge_resume_threshold = 20.0;

        let mut low = robot_spec(1, 0.0, 0.0, 1.0);
        low.battery = 3.2;
        let s = scenario(vec![low], vec![job_spec(1, (1.0, 0.0), (2.0, 0.0), 10)]);
        let mut engine = SimEngine::new(&config, &s);
        assign(&mut engine, 1, 1);

        step_until(&mut engine, 500, |e| e.robots()[0].state == RobotState::Charging);
        assert_eq!(engine.robots()[0].battery, 0.0, "clamped at depletion");
        assert_eq!(
            engine.jobs()[0].state,
            JobState::InProgress,
            "job preserved, not failed"
        );

        step_until(&mut engine, 500, |e| {
            e.robots()[0].state == RobotState::MovingToDropoff
        });
        assert!(engine.robots()[0].battery >= config.charge_resume_threshold);

        step_until(&mut engine, 500, |e| e.jobs()[0].state == JobState::Completed);
        assert_eq!(engine.robots()[0].state, RobotState::Idle);
    }

    #[test]
    fn depletion_while_servicing_pauses_the_countdown() {
        // Servicing drains like any other non-idle, non-charging state.
        // Pickup is at the spawn point, so nearly all of the 2 % battery is
        // spent inside the service countdown.
        let mut config = test_config();
        config.battery_drain_per_s = 1.0;
        config.charge_rate = 5.0;
        config.charge_resume_threshold = 20.0;

        let mut low = robot_spec(1, 0.0, 0.0, 1.0);
        low.battery = 2.0;
        let s = scenario(vec![low], vec![job_spec(1, (0.0, 0.0), (1.0, 0.0), 100)]);
        let mut engine = SimEngine::new(&config, &s);
        assign(&mut engine, 1, 1);

        step_until(&mut engine, 200, |e| e.robots()[0].state == RobotState::Charging);
        assert_eq!(engine.robots()[0].battery, 0.0);
        assert_eq!(
            engine.jobs()[0].state,
            JobState::Assigned,
            "service never finished, so the job is not yet in progress"
        );
        let paused_countdown = engine.robots()[0].service_remaining_s;
        assert!(
            paused_countdown > 0.0 && paused_countdown < config.service_time_s as f64,
            "countdown paused mid-service: {paused_countdown}"
        );

        step_until(&mut engine, 500, |e| e.robots()[0].state == RobotState::Servicing);
        assert_eq!(
            engine.robots()[0].service_remaining_s, paused_countdown,
            "servicing resumes exactly where it paused"
        );

        step_until(&mut engine, 500, |e| e.jobs()[0].state == JobState::Completed);
        assert_eq!(engine.robots()[0].state, RobotState::Idle);
    }

    #[test]
    fn idle_does_not_drain_but_servicing_does() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0)],
            vec![job_spec(1, (0.0, 0.0), (1.0, 0.0), 100)], // pickup at spawn
        );
        let mut engine = SimEngine::new(&config, &s);
        for _ in 0..10 {
            engine.step(); // idle ticks
        }
        assert_eq!(engine.robots()[0].battery, 100.0);

        assign(&mut engine, 1, 1);
        step_until(&mut engine, 10, |e| e.robots()[0].state == RobotState::Servicing);
        let at_service_start = engine.robots()[0].battery;
        for _ in 0..10 {
            engine.step(); // servicing ticks
        }
        assert!(
            engine.robots()[0].battery < at_service_start,
            "servicing is non-idle and must drain"
        );
    }
}

// ── Emissions ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod emissions {
    use super::*;

    #[test]
    fn initial_burst_covers_every_robot() {
        let config = test_config();
        let s = scenario(
            vec![
                robot_spec(1, 0.0, 0.0, 1.0),
                robot_spec(2, 1.0, 1.0, 1.0),
                robot_spec(3, 2.0, 2.0, 1.0),
            ],
            vec![],
        );
        let mut engine = SimEngine::new(&config, &s);
        engine.emit_initial_updates();
        let updates = engine.take_updates();
        let ids: Vec<u32> = updates.iter().map(|u| u.update.robot_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn position_updates_throttled_to_one_per_sim_second() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0)],
            vec![job_spec(1, (50.0, 0.0), (60.0, 0.0), 500)],
        );
        let mut engine = SimEngine::new(&config, &s);
        assign(&mut engine, 1, 1);
        engine.take_updates(); // discard the forced assignment update

        // 4 simulated seconds of steady movement, no transitions.  The forced
        // assignment update already covered second 0, so seconds 1..=3 emit.
        for _ in 0..20 {
            engine.step();
        }
        let updates = engine.take_updates();
        assert_eq!(
            updates.len(),
            3,
            "one position update per incremented sim-second"
        );
        let times: Vec<u64> = updates.iter().map(|u| u.sim_time_s).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]), "strictly increasing: {times:?}");
    }

    #[test]
    fn transitions_always_emit() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 2.0)],
            vec![job_spec(1, (0.4, 0.0), (0.8, 0.0), 100)],
        );
        let mut engine = SimEngine::new(&config, &s);
        assign(&mut engine, 1, 1);
        engine.take_updates();
        engine.step(); // arrives at pickup within one tick → Servicing
        let updates = engine.take_updates();
        assert!(
            updates
                .iter()
                .any(|u| u.update.state == RobotState::Servicing),
            "transition inside second 0 must force an emission"
        );
    }

    #[test]
    fn monotone_sim_time_across_stream() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.5), robot_spec(2, 9.0, 9.0, 1.0)],
            vec![
                job_spec(1, (3.0, 0.0), (6.0, 0.0), 100),
                job_spec(2, (9.0, 5.0), (0.0, 5.0), 100),
            ],
        );
        let mut engine = SimEngine::new(&config, &s);
        engine.emit_initial_updates();
        assign(&mut engine, 1, 1);
        assign(&mut engine, 2, 2);

        let mut all_times = Vec::new();
        for _ in 0..300 {
            engine.step();
            all_times.extend(engine.take_updates().into_iter().map(|u| u.sim_time_s));
        }
        assert!(
            all_times.windows(2).all(|w| w[0] <= w[1]),
            "sim_time_s must be non-decreasing in emission order"
        );
    }
}

// ── Snapshot invariants ───────────────────────────────────────────────────────

#[cfg(test)]
mod snapshot {
    use super::*;

    #[test]
    fn at_most_one_job_per_robot_throughout() {
        let config = test_config();
        let s = scenario(
            vec![robot_spec(1, 0.0, 0.0, 1.0), robot_spec(2, 5.0, 5.0, 1.2)],
            vec![
                job_spec(1, (1.0, 0.0), (3.0, 0.0), 100),
                job_spec(2, (5.0, 6.0), (5.0, 9.0), 100),
                job_spec(3, (2.0, 2.0), (3.0, 3.0), 100),
            ],
        );
        let mut engine = SimEngine::new(&config, &s);
        assign(&mut engine, 1, 1);
        assign(&mut engine, 2, 2);
        assign(&mut engine, 3, 1); // rejected: robot 1 busy

        for _ in 0..400 {
            engine.step();
            let snap = engine.snapshot();
            for robot in &snap.robots {
                // `current_job_id` is a single Option — the structural
                // invariant; additionally no two robots share a job.
                if let Some(job_id) = &robot.current_job_id {
                    let holders = snap
                        .robots
                        .iter()
                        .filter(|r| r.current_job_id.as_ref() == Some(job_id))
                        .count();
                    assert_eq!(holders, 1, "job {job_id} held by {holders} robots");
                }
            }
        }
    }

    #[test]
    fn snapshot_lists_are_id_ordered() {
        let config = test_config();
        let s = scenario(
            vec![
                robot_spec(1, 0.0, 0.0, 1.0),
                robot_spec(2, 1.0, 0.0, 1.0),
                robot_spec(3, 2.0, 0.0, 1.0),
            ],
            vec![
                job_spec(1, (1.0, 0.0), (2.0, 0.0), 50),
                job_spec(2, (3.0, 0.0), (4.0, 0.0), 60),
            ],
        );
        let engine = SimEngine::new(&config, &s);
        let snap = engine.snapshot();
        let robot_ids: Vec<u32> = snap.robots.iter().map(|r| r.id.0).collect();
        assert_eq!(robot_ids, vec![1, 2, 3]);
        let job_ids: Vec<String> = snap.jobs.iter().map(|j| j.id.0.clone()).collect();
        assert_eq!(job_ids, vec!["job_1", "job_2"]);
    }
}

// ── Metrics ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod metrics {
    use super::*;

    fn finished_job(n: usize, deadline: u64, completed: u64) -> Job {
        let mut job = Job::from_spec(&job_spec(n, (0.0, 0.0), (1.0, 0.0), deadline));
        job.state = JobState::Completed;
        job.completed_sim_ts = Some(completed);
        job.lateness_s = completed as f64 - deadline as f64;
        job
    }

    #[test]
    fn arithmetic_holds() {
        let jobs = vec![
            finished_job(1, 100, 50),  // on time
            finished_job(2, 100, 150), // late by 50
            {
                let mut j = Job::from_spec(&job_spec(3, (0.0, 0.0), (1.0, 0.0), 10));
                j.state = JobState::Failed;
                j.completed_sim_ts = Some(200);
                j.lateness_s = 190.0;
                j
            },
            Job::from_spec(&job_spec(4, (0.0, 0.0), (1.0, 0.0), 10)), // pending
        ];
        let mut robot = Robot::from_spec(&robot_spec(1, 0.0, 0.0, 1.0));
        robot.distance_traveled = 12.5;
        let m = compute_metrics(&jobs, &[robot]);

        assert_eq!(m.total_jobs, 4);
        assert_eq!(m.completed_jobs, 2);
        assert_eq!(m.failed_jobs, 1);
        assert!(m.completed_jobs + m.failed_jobs <= m.total_jobs);
        assert_eq!(m.on_time_rate, 0.25, "1 on-time of 4 total");
        assert_eq!(m.avg_completion_time, 100.0, "(50 + 150) / 2");
        assert_eq!(m.max_lateness, 50.0, "failed jobs excluded");
        assert_eq!(m.total_distance, 12.5);
    }

    #[test]
    fn empty_world_is_all_zeroes() {
        let m = compute_metrics(&[], &[]);
        assert_eq!(m.total_jobs, 0);
        assert_eq!(m.on_time_rate, 0.0);
        assert_eq!(m.avg_completion_time, 0.0);
        assert_eq!(m.max_lateness, 0.0);
    }

    #[test]
    fn early_completion_has_zero_clamped_lateness() {
        let jobs = vec![finished_job(1, 100, 40)];
        let m = compute_metrics(&jobs, &[]);
        assert_eq!(m.max_lateness, 0.0);
        assert_eq!(m.on_time_rate, 1.0);
    }
}

// ── Runner over the bus ───────────────────────────────────────────────────────

#[cfg(test)]
mod runner {
    use super::*;
    use fleet_bus::TopicExchange;
    use fleet_events::payload::RunIdentity;
    use fleet_events::{Envelope, EventBody, RunStarted};

    use crate::runner::SimRunner;

    fn identity(mode: Mode) -> RunIdentity {
        RunIdentity {
            run_id: "run-1".to_owned(),
            mode,
            seed: 42,
            scale: Scale::Mini,
        }
    }

    fn run_started(bus: &TopicExchange, robots: Option<usize>, jobs: Option<usize>) {
        let env = Envelope::new(
            identity(Mode::Baseline),
            0,
            "t".to_owned(),
            EventBody::RunStarted(RunStarted { robots, jobs }),
        );
        bus.publish(env.routing_key(), &env.encode().unwrap());
    }

    #[test]
    fn startup_burst_publishes_jobs_then_robots() {
        let bus = TopicExchange::new("amr.events");
        let created = bus.bind("t.job_created", &["job.created"]);
        let updated = bus.bind("t.robot_updated", &["robot.updated"]);
        let mut runner = SimRunner::new(test_config(), &bus);

        run_started(&bus, None, None);
        runner.poll_start().unwrap();

        assert_eq!(created.len(), 5, "mini scale publishes 5 job.created");
        assert_eq!(updated.len(), 5, "initial robot.updated per robot");
    }

    #[test]
    fn unassigned_run_fails_all_jobs_and_completes() {
        let mut config = test_config();
        config.max_sim_seconds = 3;
        let bus = TopicExchange::new("amr.events");
        let failed = bus.bind("t.job_failed", &["job.failed"]);
        let completed = bus.bind("t.run_completed", &["run.completed"]);
        let mut runner = SimRunner::new(config, &bus);

        run_started(&bus, None, None);
        runner.poll_start().unwrap();
        while runner.pump().unwrap() {}

        assert!(runner.is_finished());
        assert_eq!(failed.len(), 5, "no dispatcher → every job fails");
        let raw = completed.pop().unwrap();
        let env = Envelope::decode(&raw).unwrap();
        match env.body {
            EventBody::RunCompleted(body) => {
                let metrics = body.metrics.unwrap();
                assert_eq!(metrics.total_jobs, 5);
                assert_eq!(metrics.failed_jobs, 5);
                assert_eq!(metrics.completed_jobs, 0);
                assert_eq!(body.scenario_hash.unwrap().len(), 64);
            }
            other => panic!("wrong body: {other:?}"),
        }
    }

    #[test]
    fn scenario_failure_publishes_failure_marker() {
        let bus = TopicExchange::new("amr.events");
        let completed = bus.bind("t.run_completed", &["run.completed"]);
        let mut runner = SimRunner::new(test_config(), &bus);

        run_started(&bus, Some(3), None); // partial override → invalid
        runner.poll_start().unwrap();

        assert!(runner.is_finished());
        let env = Envelope::decode(&completed.pop().unwrap()).unwrap();
        match env.body {
            EventBody::RunCompleted(body) => {
                assert_eq!(body.status.as_deref(), Some("failed"));
                assert!(body.error.is_some());
                assert!(body.metrics.is_none());
            }
            other => panic!("wrong body: {other:?}"),
        }
    }

    #[test]
    fn malformed_run_started_is_dropped() {
        let bus = TopicExchange::new("amr.events");
        let mut runner = SimRunner::new(test_config(), &bus);
        bus.publish("run.started", b"{broken");
        runner.poll_start().unwrap();
        assert!(!runner.is_finished());
        assert!(runner.engine().is_none());
    }

    #[test]
    fn assigned_job_completes_over_the_bus() {
        let mut config = test_config();
        config.max_sim_seconds = 300;
        let bus = TopicExchange::new("amr.events");
        let created = bus.bind("t.job_created", &["job.created"]);
        let completed_jobs = bus.bind("t.job_completed", &["job.completed"]);
        let mut runner = SimRunner::new(config, &bus);

        run_started(&bus, None, None);
        runner.poll_start().unwrap();

        // Hand every job to robot 1..5 round-robin, like a trivial dispatcher.
        let ident = identity(Mode::Baseline);
        for (i, raw) in created.drain().into_iter().enumerate() {
            let env = Envelope::decode(&raw).unwrap();
            let EventBody::JobCreated(job) = env.body else { panic!() };
            let assigned = Envelope::new(
                ident.clone(),
                0,
                "t".to_owned(),
                EventBody::JobAssigned(fleet_events::JobAssigned {
                    job_id: job.job_id.clone(),
                    robot_id: RobotId((i % 5) as u32 + 1),
                    reason: "test".to_owned(),
                    idempotency_key: format!("run-1:{}", job.job_id),
                }),
            );
            bus.publish(assigned.routing_key(), &assigned.encode().unwrap());
        }

        while runner.pump().unwrap() {}
        assert!(
            !completed_jobs.is_empty(),
            "at least one job must complete once assigned"
        );
    }
}
