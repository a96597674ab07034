//! Drag and resize gestures.
//!
//! A gesture lives from pointer-down to pointer-up. While it lives, every
//! pointer move is turned into a bounded geometry update computed from the
//! snapshot taken at pointer-down, so rounding never accumulates.

use kurbo::Point;

use crate::input::pointer_delta;
use crate::transform::to_logical;
use crate::widget::{Geometry, MIN_HEIGHT, MIN_WIDTH, WidgetId, WidgetPatch};

/// What a gesture does to its widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionMode {
    Dragging,
    Resizing,
}

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionState {
    Idle,
    Dragging,
    Resizing,
}

/// A geometry change produced by a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryUpdate {
    Move { x: i32, y: i32 },
    Resize { width: i32, height: i32 },
}

impl From<GeometryUpdate> for WidgetPatch {
    fn from(update: GeometryUpdate) -> Self {
        match update {
            GeometryUpdate::Move { x, y } => WidgetPatch::position(x, y),
            GeometryUpdate::Resize { width, height } => WidgetPatch::size(width, height),
        }
    }
}

/// State of one live gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionSession {
    /// The widget being manipulated.
    pub widget_id: WidgetId,
    pub mode: InteractionMode,
    /// Pointer position at pointer-down, in screen coordinates.
    pub origin_pointer: Point,
    /// Widget geometry at pointer-down, in logical coordinates.
    pub origin_geometry: Geometry,
    /// Last update emitted, to drop moves that change nothing.
    last_update: Option<GeometryUpdate>,
}

impl InteractionSession {
    pub fn new(widget_id: WidgetId, mode: InteractionMode, origin_pointer: Point, origin_geometry: Geometry) -> Self {
        Self {
            widget_id,
            mode,
            origin_pointer,
            origin_geometry,
            last_update: None,
        }
    }

    /// Geometry update for a pointer at `pointer`, at the given scale.
    pub fn update_at(&self, pointer: Point, scale: f64) -> GeometryUpdate {
        let delta = pointer_delta(self.origin_pointer, pointer);
        let dx = to_logical(delta.x, scale);
        let dy = to_logical(delta.y, scale);
        let origin = self.origin_geometry;
        match self.mode {
            InteractionMode::Dragging => GeometryUpdate::Move {
                x: round_clamped(origin.x as f64 + dx, 0),
                y: round_clamped(origin.y as f64 + dy, 0),
            },
            InteractionMode::Resizing => GeometryUpdate::Resize {
                width: round_clamped(origin.width as f64 + dx, MIN_WIDTH),
                height: round_clamped(origin.height as f64 + dy, MIN_HEIGHT),
            },
        }
    }
}

fn round_clamped(value: f64, min: i32) -> i32 {
    // Float-to-int casts saturate, so huge deltas cannot wrap.
    (value.round() as i32).max(min)
}

/// Drives at most one gesture at a time.
#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    session: Option<InteractionSession>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        match self.session.as_ref().map(|s| s.mode) {
            None => InteractionState::Idle,
            Some(InteractionMode::Dragging) => InteractionState::Dragging,
            Some(InteractionMode::Resizing) => InteractionState::Resizing,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// The live session, if any.
    pub fn session(&self) -> Option<&InteractionSession> {
        self.session.as_ref()
    }

    /// Start a gesture. Returns false, and changes nothing, while another
    /// gesture is still live.
    pub fn begin(&mut self, widget_id: WidgetId, mode: InteractionMode, pointer: Point, geometry: Geometry) -> bool {
        if let Some(active) = &self.session {
            log::debug!(
                "Ignoring pointer-down on {} while {} is still {:?}",
                widget_id,
                active.widget_id,
                active.mode
            );
            return false;
        }
        self.session = Some(InteractionSession::new(widget_id, mode, pointer, geometry));
        true
    }

    /// Handle a pointer move. Returns the update to apply, or `None` when idle
    /// or when the geometry would not change.
    pub fn pointer_moved(&mut self, pointer: Point, scale: f64) -> Option<(WidgetId, GeometryUpdate)> {
        let session = self.session.as_mut()?;
        let update = session.update_at(pointer, scale);
        if session.last_update == Some(update) {
            return None;
        }
        session.last_update = Some(update);
        Some((session.widget_id.clone(), update))
    }

    /// End the live gesture. Returns the finished session exactly once.
    pub fn end(&mut self) -> Option<InteractionSession> {
        self.session.take()
    }

    /// Abandon the live gesture. Updates already emitted stay applied.
    pub fn cancel(&mut self) -> Option<InteractionSession> {
        let session = self.session.take();
        if let Some(s) = &session {
            log::debug!("Cancelled {:?} of {}", s.mode, s.widget_id);
        }
        session
    }
}
