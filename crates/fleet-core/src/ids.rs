//! Identifier types for robots and jobs.
//!
//! Robot ids are small 1-based integers assigned at scenario generation.
//! Job ids are the stable strings (`job_1`, `job_2`, …) that travel on the
//! wire; the canonical job order sorts them as plain strings, ascending, so
//! `JobId` derives `Ord` on the inner string and nothing else.

use std::fmt;

// ── RobotId ───────────────────────────────────────────────────────────────────

/// 1-based robot identifier, ascending in scenario-generation order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RobotId(pub u32);

impl RobotId {
    /// Index into a dense `Vec` of robots generated in id order (ids start
    /// at 1, so robot 1 lives at slot 0).
    #[inline]
    pub fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "robot_{}", self.0)
    }
}

// ── JobId ─────────────────────────────────────────────────────────────────────

/// Stable job identifier (`job_{n}`).
///
/// Ordering is the plain string ordering — this is the `job_id ASC` leg of
/// the canonical job sort and must never be replaced with a numeric parse.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct JobId(pub String);

impl JobId {
    /// The id assigned to the `n`-th generated job (1-based).
    pub fn nth(n: usize) -> Self {
        JobId(format!("job_{n}"))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_owned())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}
