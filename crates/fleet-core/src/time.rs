//! Simulation time model.
//!
//! # Design
//!
//! Time is a monotonically increasing tick counter; one tick advances
//! simulated time by `1 / tick_hz` seconds (default 5 Hz → 0.2 s per tick).
//! The observable unit everywhere on the wire is `sim_time_s`, the *whole*
//! simulated seconds elapsed (`tick / tick_hz` in integer arithmetic), so
//! events stay integer-timestamped regardless of the tick rate.
//!
//! Simulation time and wall clock are fully decoupled: the driver may run
//! ticks as fast as the CPU allows.

use std::fmt;

/// Tick counter + tick rate for one run.
///
/// Cheap to copy; holds no heap data.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimClock {
    /// Ticks elapsed since run start.
    pub tick: u64,
    /// Ticks per simulated second.  Default: 5.
    pub tick_hz: u32,
}

impl SimClock {
    pub fn new(tick_hz: u32) -> Self {
        Self { tick: 0, tick_hz: tick_hz.max(1) }
    }

    /// Advance the clock by one tick.
    #[inline]
    pub fn advance(&mut self) {
        self.tick += 1;
    }

    /// Whole simulated seconds elapsed.
    #[inline]
    pub fn sim_time_s(&self) -> u64 {
        self.tick / self.tick_hz as u64
    }

    /// Simulated seconds spanned by one tick.
    #[inline]
    pub fn dt(&self) -> f64 {
        1.0 / self.tick_hz as f64
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{} ({} s)", self.tick, self.sim_time_s())
    }
}
