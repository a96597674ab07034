//! Resize handle geometry.

use kurbo::{Point, Rect, Size};

/// Resize handle edge length in screen pixels.
pub const RESIZE_HANDLE_SIZE: f64 = 12.0;

/// Screen rectangle of the resize handle for a widget's screen rectangle.
///
/// The handle is a square centred on the bottom-right corner, so half of it
/// sits outside the widget body.
pub fn resize_handle_rect(widget_rect: Rect) -> Rect {
    Rect::from_center_size(
        Point::new(widget_rect.x1, widget_rect.y1),
        Size::new(RESIZE_HANDLE_SIZE, RESIZE_HANDLE_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_centred_on_corner() {
        let handle = resize_handle_rect(Rect::new(25.0, 25.0, 225.0, 75.0));
        assert_eq!(handle, Rect::new(219.0, 69.0, 231.0, 81.0));
    }
}
