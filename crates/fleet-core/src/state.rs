//! Robot/job lifecycle states and run-level enums.
//!
//! String forms are the snake_case labels that travel on the wire and must
//! never change: dispatcher projections and external consumers match on them.

use std::fmt;
use std::str::FromStr;

use crate::CoreError;

// ── RobotState ────────────────────────────────────────────────────────────────

/// What a robot is doing at a simulation instant.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RobotState {
    #[default]
    Idle,
    MovingToPickup,
    MovingToDropoff,
    Servicing,
    Charging,
}

impl RobotState {
    /// `true` for the two movement states that consume battery.
    #[inline]
    pub fn is_moving(self) -> bool {
        matches!(self, RobotState::MovingToPickup | RobotState::MovingToDropoff)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RobotState::Idle            => "idle",
            RobotState::MovingToPickup  => "moving_to_pickup",
            RobotState::MovingToDropoff => "moving_to_dropoff",
            RobotState::Servicing       => "servicing",
            RobotState::Charging        => "charging",
        }
    }
}

impl fmt::Display for RobotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── JobState ──────────────────────────────────────────────────────────────────

/// Job lifecycle.  Transitions are monotone:
/// `pending → assigned → in_progress → {completed, failed}`.
///
/// `unassigned` is a wire-compatible alias state for a job returned to the
/// pool; it is assignable exactly like `pending`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JobState {
    #[default]
    Pending,
    Unassigned,
    Assigned,
    InProgress,
    Completed,
    Failed,
}

impl JobState {
    /// `true` if a `job.assigned` command may still materialise.
    #[inline]
    pub fn is_assignable(self) -> bool {
        matches!(self, JobState::Pending | JobState::Unassigned)
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending    => "pending",
            JobState::Unassigned => "unassigned",
            JobState::Assigned   => "assigned",
            JobState::InProgress => "in_progress",
            JobState::Completed  => "completed",
            JobState::Failed     => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Mode ──────────────────────────────────────────────────────────────────────

/// Assignment policy selected for a run.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Mode {
    #[default]
    Baseline,
    Ga,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Baseline => "baseline",
            Mode::Ga       => "ga",
        }
    }
}

impl FromStr for Mode {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(Mode::Baseline),
            "ga"       => Ok(Mode::Ga),
            other      => Err(CoreError::Parse(format!("invalid mode: {other}"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Scale ─────────────────────────────────────────────────────────────────────

/// Scenario size preset mapping to `(n_robots, n_jobs)`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Scale {
    Mini,
    Small,
    #[default]
    Demo,
    Large,
}

impl Scale {
    /// `(n_robots, n_jobs)` defaults for this preset.
    pub fn counts(self) -> (usize, usize) {
        match self {
            Scale::Mini  => (5, 5),
            Scale::Small => (5, 25),
            Scale::Demo  => (10, 50),
            Scale::Large => (20, 100),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scale::Mini  => "mini",
            Scale::Small => "small",
            Scale::Demo  => "demo",
            Scale::Large => "large",
        }
    }
}

impl FromStr for Scale {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mini"  => Ok(Scale::Mini),
            "small" => Ok(Scale::Small),
            "demo"  => Ok(Scale::Demo),
            "large" => Ok(Scale::Large),
            other   => Err(CoreError::Parse(format!("invalid scale: {other}"))),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
