//! The overlay canvas widget.

use egui::{
    Align2, Color32, CornerRadius, CursorIcon, Event, FontId, Painter, PointerButton, Pos2, Rect, Response, Sense,
    Stroke, StrokeKind, Ui, Widget, vec2,
};
use overlay_core::{
    CanvasRenderer, HitTarget, InteractionState, MouseButton, PointerEvent, TextAlign, WidgetContent, WidgetView,
    widget::RESIZE_HANDLE_SIZE,
};

use crate::colors::parse_hex_color;
use crate::{sizing, theme};

/// Paints the editor scene and feeds pointer input to the renderer.
///
/// The widget fills the space available to it. The canvas is the largest
/// area with the overlay's aspect ratio, centred in that space; a press in
/// the margin around it clears the selection.
pub struct OverlayCanvas<'a> {
    renderer: &'a mut CanvasRenderer,
}

impl<'a> OverlayCanvas<'a> {
    pub fn new(renderer: &'a mut CanvasRenderer) -> Self {
        Self { renderer }
    }
}

impl Widget for OverlayCanvas<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let Self { renderer } = self;
        let available = ui.available_size();
        renderer.set_container_size(kurbo::Size::new(available.x as f64, available.y as f64));
        let size = renderer.transform().canvas_size();
        let (container, response) = ui.allocate_exact_size(available, Sense::click_and_drag());
        let rect = Rect::from_center_size(container.center(), vec2(size.width as f32, size.height as f32));

        let events = ui.input(|i| i.events.clone());
        let mut changed = false;
        for event in &events {
            changed |= match translate_event(event, rect) {
                Some(pointer) => renderer.handle_pointer_event(pointer),
                None if is_margin_press(event, rect, container) => renderer.clear_selection(),
                None => false,
            };
        }
        if changed {
            ui.ctx().request_repaint();
        }

        if let Some(hover) = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p)) {
            let cursor = match renderer.interaction_state() {
                InteractionState::Resizing => CursorIcon::ResizeSouthEast,
                InteractionState::Dragging => CursorIcon::Grabbing,
                InteractionState::Idle => match renderer.hit_test(to_canvas(hover, rect)) {
                    HitTarget::ResizeHandle(_) => CursorIcon::ResizeSouthEast,
                    HitTarget::Body(_) => CursorIcon::Move,
                    HitTarget::Background => CursorIcon::Default,
                },
            };
            ui.ctx().set_cursor_icon(cursor);
        }

        if ui.is_rect_visible(rect) {
            let scale = renderer.scale() as f32;
            let painter = ui.painter_at(rect.expand(RESIZE_HANDLE_SIZE as f32 / 2.0));
            paint_checkerboard(&painter, rect, scale);
            for view in renderer.scene() {
                paint_widget(&painter, rect.min, view);
            }
        }

        response
    }
}

fn to_canvas(pos: Pos2, canvas: Rect) -> kurbo::Point {
    kurbo::Point::new((pos.x - canvas.min.x) as f64, (pos.y - canvas.min.y) as f64)
}

fn to_screen_rect(rect: kurbo::Rect, origin: Pos2) -> Rect {
    Rect::from_min_max(
        Pos2::new(origin.x + rect.x0 as f32, origin.y + rect.y0 as f32),
        Pos2::new(origin.x + rect.x1 as f32, origin.y + rect.y1 as f32),
    )
}

fn to_mouse_button(button: PointerButton) -> Option<MouseButton> {
    match button {
        PointerButton::Primary => Some(MouseButton::Left),
        PointerButton::Secondary => Some(MouseButton::Right),
        PointerButton::Middle => Some(MouseButton::Middle),
        PointerButton::Extra1 | PointerButton::Extra2 => None,
    }
}

/// Translate an egui input event into a canvas-local pointer event.
///
/// Presses count only over the canvas (handles may poke out by half their
/// size). Moves and releases count anywhere so a gesture can leave the
/// canvas and still end.
pub fn translate_event(event: &Event, canvas: Rect) -> Option<PointerEvent> {
    match event {
        Event::PointerMoved(pos) => Some(PointerEvent::Move {
            position: to_canvas(*pos, canvas),
        }),
        Event::PointerButton {
            pos, button, pressed, ..
        } => {
            let button = to_mouse_button(*button)?;
            let position = to_canvas(*pos, canvas);
            if !*pressed {
                return Some(PointerEvent::Up { position, button });
            }
            let hit_area = canvas.expand(RESIZE_HANDLE_SIZE as f32 / 2.0);
            hit_area
                .contains(*pos)
                .then_some(PointerEvent::Down { position, button })
        }
        Event::WindowFocused(false) => Some(PointerEvent::Cancel),
        _ => None,
    }
}

/// A primary press inside the container but away from the canvas.
fn is_margin_press(event: &Event, canvas: Rect, container: Rect) -> bool {
    match event {
        Event::PointerButton {
            pos,
            button: PointerButton::Primary,
            pressed: true,
            ..
        } => container.contains(*pos) && !canvas.expand(RESIZE_HANDLE_SIZE as f32 / 2.0).contains(*pos),
        _ => false,
    }
}

fn paint_checkerboard(painter: &Painter, rect: Rect, scale: f32) {
    painter.rect_filled(rect, CornerRadius::ZERO, theme::CHECKER_DARK);
    let tile = sizing::CHECKER_TILE * scale;
    if tile < 2.0 {
        return;
    }
    let cols = (rect.width() / tile).ceil() as usize;
    let rows = (rect.height() / tile).ceil() as usize;
    for row in 0..rows {
        for col in (row % 2..cols).step_by(2) {
            let min = rect.min + vec2(col as f32 * tile, row as f32 * tile);
            let cell = Rect::from_min_size(min, vec2(tile, tile)).intersect(rect);
            painter.rect_filled(cell, CornerRadius::ZERO, theme::CHECKER_LIGHT);
        }
    }
}

fn paint_widget(painter: &Painter, origin: Pos2, view: &WidgetView) {
    let rect = to_screen_rect(view.screen_rect, origin);
    let radius = CornerRadius::same(sizing::WIDGET_RADIUS);

    painter.rect_filled(rect, radius, theme::WIDGET_BODY);
    let content = painter.with_clip_rect(rect.intersect(painter.clip_rect()));
    paint_content(&content, rect, &view.content);

    let border = if view.unsynced {
        Stroke::new(sizing::RING_WIDTH, theme::WARNING)
    } else if view.selected {
        Stroke::new(1.0, theme::ACCENT)
    } else if view.hovered {
        Stroke::new(1.0, Color32::from_white_alpha(160))
    } else {
        Stroke::new(1.0, theme::WIDGET_BORDER)
    };
    painter.rect_stroke(rect, radius, border, StrokeKind::Inside);
    if view.selected {
        painter.rect_stroke(
            rect,
            radius,
            Stroke::new(sizing::RING_WIDTH, theme::ACCENT.gamma_multiply(0.6)),
            StrokeKind::Outside,
        );
    }

    let handle = to_screen_rect(view.handle_rect, origin);
    painter.rect_filled(handle, CornerRadius::same(1), theme::HANDLE);
    painter.rect_stroke(
        handle,
        CornerRadius::same(1),
        Stroke::new(1.0, Color32::from_black_alpha(51)),
        StrokeKind::Inside,
    );
}

fn paint_content(painter: &Painter, rect: Rect, content: &WidgetContent) {
    let inner = rect.shrink(sizing::TEXT_PADDING);
    match content {
        WidgetContent::Text {
            text,
            font_size,
            align,
            color,
        } => {
            if *font_size < 1.0 {
                return;
            }
            let (pos, anchor) = match align {
                TextAlign::Left => (inner.left_top(), Align2::LEFT_TOP),
                TextAlign::Center => (inner.center_top(), Align2::CENTER_TOP),
                TextAlign::Right => (inner.right_top(), Align2::RIGHT_TOP),
            };
            painter.text(
                pos,
                anchor,
                text,
                FontId::proportional(*font_size as f32),
                parse_hex_color(color.as_str()),
            );
        }
        WidgetContent::Timer {
            label,
            font_size,
            color,
        } => {
            if *font_size < 1.0 {
                return;
            }
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                label,
                FontId::proportional(*font_size as f32),
                parse_hex_color(color.as_str()),
            );
        }
        WidgetContent::Placeholder { label } => {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                label,
                FontId::proportional(12.0),
                theme::TEXT_MUTED,
            );
        }
    }
}
