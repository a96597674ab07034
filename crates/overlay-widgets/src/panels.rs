//! Side panels: widget palette, canvas resolution, inspector, load status.

use egui::{DragValue, RichText, TextEdit, Ui};
use overlay_core::{
    CanvasRenderer, EditorResult, LoadState, TextAlign, WidgetField, WidgetKind, WidgetLogic,
};
use serde_json::Value;

use crate::colors::{color_to_hex, parse_hex_color};
use crate::layout::{field_label, section_label};
use crate::{sizing, theme};

/// Largest resolution the canvas inputs accept.
const MAX_RESOLUTION: u32 = 16_384;
const MAX_FONT_SIZE: u32 = 512;

/// "Add widget" buttons. Returns the kind the user asked for.
pub fn widget_palette(ui: &mut Ui) -> Option<WidgetKind> {
    section_label(ui, "ADD WIDGET");
    let mut requested = None;
    for (label, kind) in [("Text", WidgetKind::Text), ("Timer", WidgetKind::Timer)] {
        let button = egui::Button::new(label).min_size(egui::vec2(ui.available_width(), 28.0));
        if ui.add(button).clicked() {
            requested = Some(kind);
        }
    }
    requested
}

/// Width and height inputs for the overlay's logical resolution.
/// Returns true if the user changed either.
pub fn resolution_editor(ui: &mut Ui, renderer: &mut CanvasRenderer) -> bool {
    section_label(ui, "CANVAS");
    let resolution = renderer.resolution();
    let mut width = resolution.width.max(0.0) as u32;
    let mut height = resolution.height.max(0.0) as u32;

    let mut changed = false;
    ui.horizontal(|ui| {
        field_label(ui, "W");
        changed |= ui.add(DragValue::new(&mut width).range(0..=MAX_RESOLUTION)).changed();
        field_label(ui, "H");
        changed |= ui.add(DragValue::new(&mut height).range(0..=MAX_RESOLUTION)).changed();
    });

    if changed {
        renderer.set_resolution(width as f64, height as f64);
    }
    changed
}

fn align_key(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "left",
        TextAlign::Center => "center",
        TextAlign::Right => "right",
    }
}

fn align_label(align: TextAlign) -> &'static str {
    match align {
        TextAlign::Left => "Left",
        TextAlign::Center => "Center",
        TextAlign::Right => "Right",
    }
}

enum Edit {
    Geometry(WidgetField, i32),
    Config(&'static str, Value),
}

/// Property editor for the selected widget.
///
/// Returns true if an edit was applied. Invalid values come back as errors
/// and leave the widget unchanged.
pub fn inspector(ui: &mut Ui, renderer: &mut CanvasRenderer) -> EditorResult<bool> {
    section_label(ui, "INSPECTOR");
    let Some(widget) = renderer.selected_widget() else {
        ui.label(RichText::new("Select a widget to edit its properties.").color(theme::TEXT_MUTED));
        return Ok(false);
    };
    let geometry = widget.geometry;
    let title = format!("{} widget", widget.kind().to_uppercase());
    let text_config = match &widget.logic {
        WidgetLogic::Text(config) => Some(config.clone()),
        _ => None,
    };

    ui.label(RichText::new(title).strong());
    let mut edits = Vec::new();

    egui::Grid::new("inspector_geometry").num_columns(4).show(ui, |ui| {
        let rows = [
            [("X", WidgetField::X, geometry.x), ("Y", WidgetField::Y, geometry.y)],
            [
                ("W", WidgetField::Width, geometry.width),
                ("H", WidgetField::Height, geometry.height),
            ],
        ];
        for row in rows {
            for (label, field, value) in row {
                field_label(ui, label);
                let mut value = value;
                let input = DragValue::new(&mut value);
                if ui.add_sized([sizing::FIELD_WIDTH, 18.0], input).changed() {
                    edits.push(Edit::Geometry(field, value));
                }
            }
            ui.end_row();
        }
    });

    if let Some(config) = text_config {
        ui.add_space(6.0);
        ui.label("Text");
        let mut text = config.text.clone();
        if ui.add(TextEdit::multiline(&mut text).desired_rows(3)).changed() {
            edits.push(Edit::Config("text", Value::String(text)));
        }

        ui.horizontal(|ui| {
            ui.label("Font size");
            let mut font_size = config.font_size;
            if ui
                .add(DragValue::new(&mut font_size).range(1..=MAX_FONT_SIZE))
                .changed()
            {
                edits.push(Edit::Config("fontSize", Value::from(font_size)));
            }
        });

        ui.horizontal(|ui| {
            ui.label("Color");
            let mut color = parse_hex_color(config.color.as_str());
            if ui.color_edit_button_srgba(&mut color).changed() {
                edits.push(Edit::Config("color", Value::String(color_to_hex(color))));
            }
        });

        ui.horizontal(|ui| {
            ui.label("Align");
            let mut align = config.align;
            egui::ComboBox::from_id_salt("inspector_align")
                .selected_text(align_label(align))
                .show_ui(ui, |ui| {
                    for option in [TextAlign::Left, TextAlign::Center, TextAlign::Right] {
                        ui.selectable_value(&mut align, option, align_label(option));
                    }
                });
            if align != config.align {
                edits.push(Edit::Config("align", Value::from(align_key(align))));
            }
        });
    }

    let mut changed = false;
    for edit in edits {
        let result = match edit {
            Edit::Geometry(field, value) => renderer.set_selected_geometry(field, value),
            Edit::Config(key, value) => renderer.set_selected_config(key, value),
        };
        match result {
            Ok(applied) => changed |= applied,
            Err(err) => {
                log::warn!("Inspector edit rejected: {}", err);
                return Err(err);
            }
        }
    }
    Ok(changed)
}

/// Loading indicator or inline load error.
pub fn load_status(ui: &mut Ui, state: &LoadState) {
    match state {
        LoadState::Loading => {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(RichText::new("Loading…").color(theme::TEXT_MUTED));
            });
        }
        LoadState::Failed(message) => {
            ui.colored_label(theme::ERROR, message);
        }
        LoadState::Idle | LoadState::Loaded => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::{DEFAULT_RESOLUTION, MemoryGateway, OptimisticStore, OverlayId};
    use std::sync::Arc;

    fn headless(mut add_contents: impl FnMut(&mut Ui)) {
        let ctx = egui::Context::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            egui::CentralPanel::default().show(ctx, |ui| add_contents(ui));
        });
    }

    #[test]
    fn test_align_keys_match_wire_values() {
        for align in [TextAlign::Left, TextAlign::Center, TextAlign::Right] {
            let wire = serde_json::to_value(align).unwrap();
            assert_eq!(wire, Value::from(align_key(align)));
        }
    }

    #[test]
    fn test_palette_without_clicks() {
        headless(|ui| assert_eq!(widget_palette(ui), None));
    }

    #[test]
    fn test_load_status_renders_every_state() {
        for state in [
            LoadState::Idle,
            LoadState::Loading,
            LoadState::Loaded,
            LoadState::Failed("Failed to load widgets".into()),
        ] {
            headless(|ui| load_status(ui, &state));
        }
    }

    #[tokio::test]
    async fn test_inspector_without_selection() {
        let gateway = Arc::new(MemoryGateway::new());
        let store = OptimisticStore::new(OverlayId::new("ov"), gateway, tokio::runtime::Handle::current());
        let mut renderer = CanvasRenderer::new(store, DEFAULT_RESOLUTION);
        headless(|ui| {
            assert!(!inspector(ui, &mut renderer).unwrap());
            assert!(!resolution_editor(ui, &mut renderer));
        });
        assert_eq!(renderer.resolution(), DEFAULT_RESOLUTION);
    }
}
