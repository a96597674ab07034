//! egui components for the overlay editor.
//!
//! - **Canvas**: the [`OverlayCanvas`] widget, painting the scene and routing
//!   pointer input to the editor core
//! - **Panels**: widget palette, canvas resolution, inspector, load status
//! - **Colors**: hex colour parsing and the editor palette

pub mod canvas;
pub mod colors;
pub mod layout;
pub mod panels;

pub use canvas::{OverlayCanvas, translate_event};
pub use colors::{color_to_hex, parse_hex_color};
pub use layout::{field_label, section_label};
pub use panels::{inspector, load_status, resolution_editor, widget_palette};

/// Standard sizing constants used across widgets.
pub mod sizing {
    /// Standard corner radius
    pub const CORNER_RADIUS: u8 = 4;
    /// Widget body corner radius on the canvas
    pub const WIDGET_RADIUS: u8 = 2;
    /// Checkerboard tile edge in logical pixels
    pub const CHECKER_TILE: f32 = 20.0;
    /// Selection ring width
    pub const RING_WIDTH: f32 = 2.0;
    /// Inner padding of widget bodies, in screen pixels
    pub const TEXT_PADDING: f32 = 8.0;
    /// Width of inspector inputs
    pub const FIELD_WIDTH: f32 = 72.0;
}

/// Standard colors used across widgets.
pub mod theme {
    use egui::Color32;

    /// Checkerboard light tile
    pub const CHECKER_LIGHT: Color32 = Color32::from_rgb(58, 58, 64);
    /// Checkerboard dark tile
    pub const CHECKER_DARK: Color32 = Color32::from_rgb(42, 42, 48);
    /// Widget body (black at 50%)
    pub const WIDGET_BODY: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 128);
    /// Widget border (white at 40%)
    pub const WIDGET_BORDER: Color32 = Color32::from_rgba_premultiplied(102, 102, 102, 102);
    /// Selection ring (indigo)
    pub const ACCENT: Color32 = Color32::from_rgb(99, 102, 241);
    /// Unsynced border (amber)
    pub const WARNING: Color32 = Color32::from_rgb(245, 158, 11);
    /// Error text (red)
    pub const ERROR: Color32 = Color32::from_rgb(239, 68, 68);
    /// Muted text color
    pub const TEXT_MUTED: Color32 = Color32::from_rgb(160, 160, 170);
    /// Resize handle fill
    pub const HANDLE: Color32 = Color32::WHITE;
}
