//! Colour helpers.

use egui::Color32;
use overlay_core::HexColor;

/// Parse a `#rgb` or `#rrggbb` colour. Anything else renders white.
pub fn parse_hex_color(color: &str) -> Color32 {
    match HexColor::new(color).rgb() {
        Some([r, g, b]) => Color32::from_rgb(r, g, b),
        None => Color32::WHITE,
    }
}

/// Format a colour as `#rrggbb`, dropping alpha.
pub fn color_to_hex(color: Color32) -> String {
    HexColor::from_rgb([color.r(), color.g(), color.b()]).as_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#ffffff"), Color32::WHITE);
        assert_eq!(parse_hex_color("#6366f1"), Color32::from_rgb(99, 102, 241));
        assert_eq!(parse_hex_color("#000"), Color32::BLACK);
    }

    #[test]
    fn test_invalid_falls_back_to_white() {
        assert_eq!(parse_hex_color("red"), Color32::WHITE);
        assert_eq!(parse_hex_color("#12345"), Color32::WHITE);
        assert_eq!(parse_hex_color(""), Color32::WHITE);
    }

    #[test]
    fn test_color_to_hex() {
        assert_eq!(color_to_hex(Color32::from_rgb(245, 158, 11)), "#f59e0b");
    }
}
