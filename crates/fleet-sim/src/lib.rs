//! `fleet-sim` — the authoritative world for one run.
//!
//! # Per-tick order
//!
//! ```text
//! while !engine.should_stop():
//!   ① Apply    — drain job.assigned received since the last tick and
//!                 materialise the eligible ones (idempotency-key dedup).
//!   ② Advance  — per robot in id order: kinematics toward the target,
//!                 pickup arrival → servicing countdown → moving_to_dropoff,
//!                 dropoff arrival → job completed; battery drain, charging
//!                 pause/resume.
//!   ③ Emit     — robot.updated (forced on transition, position updates
//!                 throttled to 1/sim-second), snapshot.tick every tick,
//!                 telemetry.received once per incremented sim-second,
//!                 job.completed as completions are observed.
//! finalize     — fail whatever is non-terminal, compute metrics, publish
//!                 run.completed.
//! ```
//!
//! The engine is bus-agnostic (it buffers robot updates; the runner flushes
//! them); [`runner::SimRunner`] owns the bus topology for the simulator side.
//! Simulation time is decoupled from the wall clock: the driver may pump
//! ticks as fast as the CPU allows.

pub mod engine;
pub mod entities;
pub mod error;
pub mod metrics;
pub mod runner;

#[cfg(test)]
mod tests;

pub use engine::{ApplyOutcome, Assignment, BufferedUpdate, SimEngine};
pub use entities::{Job, Robot};
pub use error::{SimError, SimResult};
pub use metrics::compute_metrics;
pub use runner::SimRunner;
