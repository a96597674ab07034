//! Layout helpers: section and field labels.

use egui::Ui;

use crate::{sizing, theme};

/// Draw a section label (small, muted text).
pub fn section_label(ui: &mut Ui, text: &str) {
    ui.label(egui::RichText::new(text).size(10.0).color(theme::TEXT_MUTED));
    ui.add_space(2.0);
}

/// Draw a fixed-width label in front of an inspector input.
pub fn field_label(ui: &mut Ui, text: &str) {
    ui.add_sized(
        [sizing::FIELD_WIDTH * 0.5, 18.0],
        egui::Label::new(egui::RichText::new(text).size(11.0)),
    );
}
