//! `fleet-core` — foundational types for the AMR fleet simulator.
//!
//! This crate is a dependency of every other `fleet-*` crate.  It intentionally
//! has no `fleet-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module       | Contents                                              |
//! |--------------|-------------------------------------------------------|
//! | [`ids`]      | `RobotId`, `JobId`                                    |
//! | [`point`]    | `Point`, Euclidean distance                           |
//! | [`time`]     | `SimClock`                                            |
//! | [`rng`]      | `SimRng` (seeded, the only randomness source)         |
//! | [`state`]    | `RobotState`, `JobState`, `Mode`, `Scale`             |
//! | [`config`]   | `FleetConfig`, `RunContext`                           |
//! | [`error`]    | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |
//!           | Required by `fleet-events`.                                |

pub mod config;
pub mod error;
pub mod ids;
pub mod point;
pub mod rng;
pub mod state;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{FleetConfig, RunContext};
pub use error::{CoreError, CoreResult};
pub use ids::{JobId, RobotId};
pub use point::Point;
pub use rng::SimRng;
pub use state::{JobState, Mode, RobotState, Scale};
pub use time::SimClock;

/// Round to 3 decimal places — the precision used for all generated and
/// reported coordinates, speeds and battery levels.
#[inline]
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Round to 6 decimal places — the precision used for run metrics.
#[inline]
pub fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}
