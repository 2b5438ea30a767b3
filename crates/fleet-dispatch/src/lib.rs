//! `fleet-dispatch` — assignment decisions from a world-state projection.
//!
//! The dispatcher consumes `run.started`, `job.created` and `robot.updated`,
//! maintains a per-run projection (never the world truth — the simulator is
//! authoritative and will reject anything stale), and emits `job.assigned`:
//!
//! - **baseline**: earliest-deadline-first + nearest idle eligible robot,
//!   swept at most once per sim-second.
//! - **ga**: whole-fleet replans through a [`Planner`], issued from per-robot
//!   planned queues as robots become idle.  Replan triggers (run start,
//!   periodic, idle-gap, battery-guard) are all coalesced behind one
//!   single-flight flag per run.
//!
//! [`Planner`]: fleet_optimize::Planner

pub mod baseline;
pub mod dispatcher;
pub mod error;
pub mod projection;


pub use baseline::{compute_baseline_assignments, BaselineAssignment, BASELINE_REASON};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult};
pub use projection::{JobView, RobotView, RunProjection};
