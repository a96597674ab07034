//! Selection and hover state for the canvas.

use crate::widget::WidgetId;

/// Tracks the selected and hovered widget.
///
/// UI state is kept apart from the widget data so a reload never has to
/// know about it. At most one widget is selected at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<WidgetId>,
    hovered: Option<WidgetId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected widget, if any.
    pub fn selected(&self) -> Option<&WidgetId> {
        self.selected.as_ref()
    }

    /// The hovered widget, if any.
    pub fn hovered(&self) -> Option<&WidgetId> {
        self.hovered.as_ref()
    }

    /// Select a single widget, replacing any previous selection.
    /// Returns true if the selection changed.
    pub fn select(&mut self, id: WidgetId) -> bool {
        if self.selected.as_ref() == Some(&id) {
            return false;
        }
        self.selected = Some(id);
        true
    }

    /// Clear the selection. Returns true if something was selected.
    pub fn clear(&mut self) -> bool {
        self.selected.take().is_some()
    }

    pub fn is_selected(&self, id: &WidgetId) -> bool {
        self.selected.as_ref() == Some(id)
    }

    pub fn is_hovered(&self, id: &WidgetId) -> bool {
        self.hovered.as_ref() == Some(id)
    }

    /// Set the hovered widget. Returns true if it changed.
    pub fn set_hovered(&mut self, id: Option<WidgetId>) -> bool {
        if self.hovered == id {
            return false;
        }
        self.hovered = id;
        true
    }

    /// Drop any ids for which `exists` returns false.
    pub fn retain(&mut self, mut exists: impl FnMut(&WidgetId) -> bool) {
        if self.selected.as_ref().is_some_and(|id| !exists(id)) {
            self.selected = None;
        }
        if self.hovered.as_ref().is_some_and(|id| !exists(id)) {
            self.hovered = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_selection() {
        let mut selection = Selection::new();
        assert!(selection.select(WidgetId::new("a")));
        assert!(selection.select(WidgetId::new("b")));
        assert!(!selection.select(WidgetId::new("b")));
        assert!(selection.is_selected(&WidgetId::new("b")));
        assert!(!selection.is_selected(&WidgetId::new("a")));
        assert!(selection.clear());
        assert!(!selection.clear());
        assert_eq!(selection.selected(), None);
    }

    #[test]
    fn test_hover() {
        let mut selection = Selection::new();
        assert!(selection.set_hovered(Some(WidgetId::new("a"))));
        assert!(!selection.set_hovered(Some(WidgetId::new("a"))));
        assert!(selection.is_hovered(&WidgetId::new("a")));
        assert!(selection.set_hovered(None));
    }

    #[test]
    fn test_retain() {
        let mut selection = Selection::new();
        selection.select(WidgetId::new("a"));
        selection.set_hovered(Some(WidgetId::new("b")));
        selection.retain(|id| id.as_str() != "a");
        assert_eq!(selection.selected(), None);
        assert!(selection.is_hovered(&WidgetId::new("b")));

        selection.select(WidgetId::new("c"));
        selection.retain(|id| id.as_str() == "c");
        assert!(selection.is_selected(&WidgetId::new("c")));
        assert_eq!(selection.hovered(), None);
    }
}
