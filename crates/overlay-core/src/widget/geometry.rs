//! Widget geometry in logical overlay pixels.

use serde::{Deserialize, Serialize};

/// Minimum widget width in logical pixels.
pub const MIN_WIDTH: i32 = 40;
/// Minimum widget height in logical pixels.
pub const MIN_HEIGHT: i32 = 30;

/// Position and size of a widget in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    /// Create a geometry, clamped to the widget invariants.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }.clamped()
    }

    /// Clamp to `x, y >= 0`, `width >= MIN_WIDTH`, `height >= MIN_HEIGHT`.
    ///
    /// There is no upper bound: widgets may extend past the canvas edge.
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.max(0),
            y: self.y.max(0),
            width: self.width.max(MIN_WIDTH),
            height: self.height.max(MIN_HEIGHT),
        }
    }

    /// Check the widget invariants.
    pub fn is_valid(&self) -> bool {
        *self == self.clamped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps() {
        let g = Geometry::new(-1, -100, 0, -30);
        assert_eq!(g, Geometry { x: 0, y: 0, width: MIN_WIDTH, height: MIN_HEIGHT });
        assert!(g.is_valid());
    }

    #[test]
    fn test_no_upper_bound() {
        let g = Geometry::new(5000, 9000, 10_000, 10_000);
        assert_eq!(g.x, 5000);
        assert_eq!(g.width, 10_000);
    }
}
