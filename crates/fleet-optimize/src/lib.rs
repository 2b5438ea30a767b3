//! `fleet-optimize` — deterministic GA assignment planning.
//!
//! The planner is a pure request/response function: given the fleet's robots
//! and the pending jobs, produce a whole-fleet job→robot assignment.  Same
//! `(seed, robots, pending_jobs, sim_time_s)` → byte-identical output; the
//! seeded RNG is the only randomness, and every tie-break is total
//! (ascending index, chromosome lexicographic order).
//!
//! | Module        | Contents                                        |
//! |---------------|-------------------------------------------------|
//! | [`plan`]      | Request/response types, the [`Planner`] seam    |
//! | [`fitness`]   | Chromosome evaluation                           |
//! | [`operators`] | Population init, selection, crossover, mutation |
//! | [`ga`]        | The GA loop and [`GaPlanner`]                   |

pub mod fitness;
pub mod ga;
pub mod operators;
pub mod plan;


pub use fitness::evaluate_chromosome;
pub use ga::{optimize, GaPlanner};
pub use plan::{
    canonical_job_order, PlanAssignment, PlanError, PlanJob, PlanMeta, PlanRequest, PlanResponse,
    PlanResult, PlanRobot, Planner,
};
