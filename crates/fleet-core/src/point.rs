//! 2D world coordinates.
//!
//! The world is a flat `[0, world_size]²` square; travel is straight-line and
//! distances are Euclidean.  Coordinates are `f64` to keep the arithmetic
//! identical between the scenario generator, the engine and the GA fitness
//! function.

/// A position in the 2D world.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Clamp both coordinates into `[0, world_size]`.
    #[inline]
    pub fn clamped(self, world_size: f64) -> Point {
        Point {
            x: self.x.clamp(0.0, world_size),
            y: self.y.clamp(0.0, world_size),
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}
