//! `fleet-scenario` — deterministic world generation.
//!
//! A scenario is a pure function of `(seed, scale/overrides, config)`:
//! robots and jobs are drawn from one seeded RNG in a fixed, documented
//! order, and the whole ordered payload is digested into `scenario_hash` so
//! that reproducibility can be asserted across runs and across policies.

pub mod generate;


pub use generate::{generate, JobSpec, RobotSpec, Scenario, ScenarioError, ScenarioResult};
