//! Pointer events for the editor canvas.
//!
//! Hosts translate their native mouse/touch events into [`PointerEvent`]s
//! in canvas-local screen coordinates (origin at the canvas top-left).

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    /// A release anywhere, including outside the canvas.
    Up {
        position: Point,
        button: MouseButton,
    },
    /// The host lost the pointer (capture lost, window blurred).
    Cancel,
}

impl PointerEvent {
    /// Position carried by the event, if any.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Down { position, .. } | Self::Move { position } | Self::Up { position, .. } => {
                Some(*position)
            }
            Self::Cancel => None,
        }
    }
}

/// Screen-space delta between two pointer positions.
pub fn pointer_delta(from: Point, to: Point) -> Vec2 {
    Vec2::new(to.x - from.x, to.y - from.y)
}
