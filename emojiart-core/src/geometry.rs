//! Canvas geometry primitives.

use serde::{Deserialize, Serialize};

/// An integer offset from the logical canvas origin.
///
/// Positions are unbounded; the presentation layer decides how they map to
/// screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset from the origin.
    pub x: i32,
    /// Vertical offset from the origin.
    pub y: i32,
}

impl Position {
    /// Create a position from its coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
