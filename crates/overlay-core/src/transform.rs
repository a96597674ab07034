//! Coordinate transform between the overlay's logical resolution and the screen.
//!
//! The overlay has a fixed logical pixel resolution (e.g. 1920x1080). The editor
//! renders it inside a container of arbitrary size with a single uniform scale,
//! so the whole canvas always fits without distortion.

use kurbo::{Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::widget::Geometry;

/// Default logical resolution for a newly opened overlay.
pub const DEFAULT_RESOLUTION: Size = Size::new(1920.0, 1080.0);

/// Compute the uniform scale that fits the overlay into the container.
///
/// Overlay dimensions are clamped to at least one logical pixel before
/// dividing, so a zero-sized overlay yields a large but finite scale.
pub fn compute_scale(
    container_width: f64,
    container_height: f64,
    overlay_width: f64,
    overlay_height: f64,
) -> f64 {
    let sx = sanitize(container_width) / overlay_width.max(1.0);
    let sy = sanitize(container_height) / overlay_height.max(1.0);
    sx.min(sy)
}

/// Convert a logical value to screen pixels.
pub fn to_screen(logical: f64, scale: f64) -> i64 {
    (logical * scale).round() as i64
}

/// Convert a screen delta to logical pixels.
pub fn to_logical(screen_delta: f64, scale: f64) -> f64 {
    if scale > 0.0 {
        screen_delta / scale
    } else {
        0.0
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

/// Cached transform state for one canvas.
///
/// Holds the last observed container size and the overlay's logical
/// resolution, and recomputes the scale whenever either changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasTransform {
    /// Observed size of the hosting viewport in screen pixels.
    container: Size,
    /// Logical resolution of the overlay.
    resolution: Size,
    /// Current uniform scale (screen pixels per logical pixel).
    scale: f64,
}

impl Default for CanvasTransform {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION)
    }
}

impl CanvasTransform {
    /// Create a transform for the given resolution with no container yet.
    pub fn new(resolution: Size) -> Self {
        Self {
            container: Size::ZERO,
            resolution,
            scale: 0.0,
        }
    }

    /// Current scale.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Observed container size.
    pub fn container(&self) -> Size {
        self.container
    }

    /// Logical resolution of the overlay.
    pub fn resolution(&self) -> Size {
        self.resolution
    }

    /// Update the container size. Returns true if the scale changed.
    pub fn set_container(&mut self, container: Size) -> bool {
        self.container = Size::new(sanitize(container.width), sanitize(container.height));
        self.recompute()
    }

    /// Update the logical resolution. Returns true if the scale changed.
    pub fn set_resolution(&mut self, resolution: Size) -> bool {
        self.resolution = resolution;
        self.recompute()
    }

    fn recompute(&mut self) -> bool {
        let scale = compute_scale(
            self.container.width,
            self.container.height,
            self.resolution.width,
            self.resolution.height,
        );
        let changed = (scale - self.scale).abs() > f64::EPSILON;
        self.scale = scale;
        changed
    }

    /// Size of the rendered canvas in screen pixels.
    pub fn canvas_size(&self) -> Size {
        Size::new(
            self.resolution.width.max(0.0) * self.scale,
            self.resolution.height.max(0.0) * self.scale,
        )
    }

    /// Screen-space rectangle for a widget's logical geometry.
    pub fn screen_rect(&self, geometry: &Geometry) -> Rect {
        let x = to_screen(geometry.x as f64, self.scale) as f64;
        let y = to_screen(geometry.y as f64, self.scale) as f64;
        let w = to_screen(geometry.width as f64, self.scale) as f64;
        let h = to_screen(geometry.height as f64, self.scale) as f64;
        Rect::new(x, y, x + w, y + h)
    }

    /// Convert a screen-space pointer delta to logical pixels.
    pub fn to_logical_delta(&self, delta: Vec2) -> Vec2 {
        Vec2::new(to_logical(delta.x, self.scale), to_logical(delta.y, self.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_is_min_of_axes() {
        assert!((compute_scale(960.0, 540.0, 1920.0, 1080.0) - 0.5).abs() < f64::EPSILON);
        assert!((compute_scale(1000.0, 540.0, 1920.0, 1080.0) - 0.5).abs() < f64::EPSILON);
        assert!((compute_scale(960.0, 2000.0, 1920.0, 1080.0) - 0.5).abs() < f64::EPSILON);
        assert!((compute_scale(300.0, 400.0, 100.0, 100.0) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_overlay_does_not_divide_by_zero() {
        let scale = compute_scale(800.0, 600.0, 0.0, 0.0);
        assert!(scale.is_finite());
        assert!((scale - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_container_gives_zero_scale() {
        assert_eq!(compute_scale(0.0, 0.0, 1920.0, 1080.0), 0.0);
        assert_eq!(to_logical(100.0, 0.0), 0.0);
    }

    #[test]
    fn test_roundtrip_within_one_unit() {
        for &scale in &[0.13, 0.5, 0.777, 1.0, 1.5, 2.25] {
            for v in (-500..500).step_by(7) {
                let v = v as f64;
                let back = to_screen(to_logical(v, scale), scale) as f64;
                assert!((back - v).abs() <= 1.0, "scale {scale} value {v} came back as {back}");
            }
        }
    }

    #[test]
    fn test_to_screen_rounds() {
        assert_eq!(to_screen(50.0, 0.5), 25);
        assert_eq!(to_screen(401.0, 0.5), 201);
        assert_eq!(to_screen(3.0, 0.5), 2);
    }

    #[test]
    fn test_transform_reports_scale_changes() {
        let mut transform = CanvasTransform::default();
        assert!(transform.set_container(Size::new(960.0, 540.0)));
        assert!((transform.scale() - 0.5).abs() < f64::EPSILON);
        assert!(!transform.set_container(Size::new(960.0, 600.0)));
        assert!(transform.set_resolution(Size::new(1280.0, 720.0)));
        assert!((transform.scale() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_screen_rect_and_canvas_size() {
        let mut transform = CanvasTransform::default();
        transform.set_container(Size::new(960.0, 540.0));
        let rect = transform.screen_rect(&Geometry::new(50, 50, 400, 100));
        assert_eq!(rect, Rect::new(25.0, 25.0, 225.0, 75.0));
        assert_eq!(transform.canvas_size(), Size::new(960.0, 540.0));
    }

    #[test]
    fn test_negative_container_is_clamped() {
        let mut transform = CanvasTransform::default();
        transform.set_container(Size::new(-10.0, f64::NAN));
        assert_eq!(transform.scale(), 0.0);
        assert_eq!(transform.container(), Size::ZERO);
    }
}
