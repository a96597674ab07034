//! Headless canvas: scene, hit-testing and pointer routing.
//!
//! [`CanvasRenderer`] ties the store, the coordinate transform, the gesture
//! controller and the selection together. It produces a flat, z-ordered
//! list of [`WidgetView`]s in screen space that a UI layer only has to
//! paint.

use std::collections::HashSet;
use std::sync::mpsc::Receiver;

use kurbo::{Point, Rect, Size};
use serde_json::Value;

use crate::error::EditorResult;
use crate::input::{MouseButton, PointerEvent};
use crate::interaction::{InteractionController, InteractionMode, InteractionState};
use crate::selection::Selection;
use crate::store::{OptimisticStore, StoreEvent};
use crate::transform::CanvasTransform;
use crate::widget::{Widget, WidgetContent, WidgetField, WidgetId, WidgetPatch, resize_handle_rect};

/// What lies under a screen point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Background,
    Body(WidgetId),
    ResizeHandle(WidgetId),
}

/// One widget as it should be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetView {
    pub id: WidgetId,
    /// Widget box in canvas-local screen pixels.
    pub screen_rect: Rect,
    pub handle_rect: Rect,
    pub z_index: i32,
    pub selected: bool,
    pub hovered: bool,
    /// Some field failed to reach the backend.
    pub unsynced: bool,
    pub content: WidgetContent,
    /// Position in the store, to keep equal z-indices in insertion order.
    order: usize,
}

/// Editor canvas state, independent of any UI toolkit.
pub struct CanvasRenderer {
    store: OptimisticStore,
    store_events: Receiver<StoreEvent>,
    transform: CanvasTransform,
    interaction: InteractionController,
    selection: Selection,
    /// Cached views, sorted bottom to top.
    scene: Vec<WidgetView>,
    rebuild: bool,
    dirty: HashSet<WidgetId>,
}

impl CanvasRenderer {
    pub fn new(mut store: OptimisticStore, resolution: Size) -> Self {
        let store_events = store.subscribe();
        Self {
            store,
            store_events,
            transform: CanvasTransform::new(resolution),
            interaction: InteractionController::new(),
            selection: Selection::new(),
            scene: Vec::new(),
            rebuild: true,
            dirty: HashSet::new(),
        }
    }

    pub fn store(&self) -> &OptimisticStore {
        &self.store
    }

    /// Mutable store access for loads and creates. Changes made here reach
    /// the scene through the store's events.
    pub fn store_mut(&mut self) -> &mut OptimisticStore {
        &mut self.store
    }

    pub fn scale(&self) -> f64 {
        self.transform.scale()
    }

    pub fn transform(&self) -> &CanvasTransform {
        &self.transform
    }

    /// Logical resolution of the overlay.
    pub fn resolution(&self) -> Size {
        self.transform.resolution()
    }

    /// Change the overlay's logical resolution. Zero is allowed here; the
    /// scale computation clamps it. Returns true if the scale changed.
    pub fn set_resolution(&mut self, width: f64, height: f64) -> bool {
        let changed = self.transform.set_resolution(Size::new(width, height));
        self.rebuild |= changed;
        changed
    }

    /// Report the size of the hosting viewport. Returns true if the scale
    /// changed.
    pub fn set_container_size(&mut self, size: Size) -> bool {
        let changed = self.transform.set_container(size);
        self.rebuild |= changed;
        changed
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.interaction.state()
    }

    /// The selected widget, if it still exists.
    pub fn selected_widget(&self) -> Option<&Widget> {
        self.selection.selected().and_then(|id| self.store.widget(id))
    }

    /// Set a geometry field of the selected widget (inspector edit).
    /// Returns false when nothing is selected.
    pub fn set_selected_geometry(&mut self, field: WidgetField, value: i32) -> EditorResult<bool> {
        let Some(id) = self.selection.selected().cloned() else {
            return Ok(false);
        };
        self.store.update(&id, WidgetPatch::field(field, value))?;
        Ok(true)
    }

    /// Set a logic config key of the selected widget (inspector edit).
    /// Returns false when nothing is selected.
    pub fn set_selected_config(&mut self, key: &str, value: impl Into<Value>) -> EditorResult<bool> {
        let Some(id) = self.selection.selected().cloned() else {
            return Ok(false);
        };
        self.store.update(&id, WidgetPatch::config(key, value))?;
        Ok(true)
    }

    /// Abandon the live gesture, if any.
    pub fn cancel_interaction(&mut self) -> bool {
        self.interaction.cancel().is_some()
    }

    /// Current scene, bottom to top.
    pub fn scene(&mut self) -> &[WidgetView] {
        self.refresh();
        &self.scene
    }

    /// Find what lies under a canvas-local screen point.
    ///
    /// Resize handles win over bodies, and higher widgets over lower ones.
    pub fn hit_test(&mut self, point: Point) -> HitTarget {
        self.refresh();
        if let Some(view) = self.scene.iter().rev().find(|v| v.handle_rect.contains(point)) {
            return HitTarget::ResizeHandle(view.id.clone());
        }
        match self.scene.iter().rev().find(|v| v.screen_rect.contains(point)) {
            Some(view) => HitTarget::Body(view.id.clone()),
            None => HitTarget::Background,
        }
    }

    /// Drop the selection, as a press on empty space does. Ignored while a
    /// gesture is running.
    pub fn clear_selection(&mut self) -> bool {
        if self.interaction.is_active() {
            return false;
        }
        let changed = self.selection.clear();
        self.sync_flags();
        changed
    }

    /// Route a pointer event. Returns true if anything visible changed.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
            } => self.pointer_down(position),
            PointerEvent::Down { .. } => false,
            PointerEvent::Move { position } => self.pointer_moved(position),
            PointerEvent::Up { .. } => self.interaction.end().is_some(),
            PointerEvent::Cancel => self.cancel_interaction(),
        }
    }

    fn pointer_down(&mut self, position: Point) -> bool {
        if self.interaction.is_active() {
            return false;
        }
        let (id, mode) = match self.hit_test(position) {
            HitTarget::Background => return self.clear_selection(),
            HitTarget::Body(id) => (id, InteractionMode::Dragging),
            HitTarget::ResizeHandle(id) => (id, InteractionMode::Resizing),
        };
        let Some(geometry) = self.store.widget(&id).map(|w| w.geometry) else {
            return false;
        };
        self.selection.select(id.clone());
        self.sync_flags();
        self.interaction.begin(id, mode, position, geometry);
        true
    }

    fn pointer_moved(&mut self, position: Point) -> bool {
        if !self.interaction.is_active() {
            let hovered = match self.hit_test(position) {
                HitTarget::Background => None,
                HitTarget::Body(id) | HitTarget::ResizeHandle(id) => Some(id),
            };
            let changed = self.selection.set_hovered(hovered);
            if changed {
                self.sync_flags();
            }
            return changed;
        }

        let Some((id, update)) = self.interaction.pointer_moved(position, self.transform.scale()) else {
            return false;
        };
        match self.store.update(&id, update.into()) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Dropping gesture on {}: {}", id, e);
                self.interaction.cancel();
                false
            }
        }
    }

    fn sync_flags(&mut self) {
        for view in &mut self.scene {
            view.selected = self.selection.is_selected(&view.id);
            view.hovered = self.selection.is_hovered(&view.id);
        }
    }

    /// Pull store outcomes and events into the cached scene.
    fn refresh(&mut self) {
        self.store.pump();
        while let Ok(event) = self.store_events.try_recv() {
            match event {
                StoreEvent::Reloaded => {
                    self.rebuild = true;
                    self.forget_missing();
                }
                StoreEvent::WidgetAdded(_) => self.rebuild = true,
                StoreEvent::WidgetChanged { id, .. } | StoreEvent::SyncChanged(id) => {
                    self.dirty.insert(id);
                }
                StoreEvent::Loading | StoreEvent::LoadFailed(_) | StoreEvent::CreateFailed(_) => {}
            }
        }

        if self.rebuild {
            self.rebuild_scene();
        } else if !self.dirty.is_empty() {
            self.update_dirty();
        }
    }

    fn forget_missing(&mut self) {
        let store = &self.store;
        self.selection.retain(|id| store.widget(id).is_some());
        let gone = self
            .interaction
            .session()
            .is_some_and(|s| store.widget(&s.widget_id).is_none());
        if gone {
            self.interaction.cancel();
        }
    }

    fn view_for(&self, widget: &Widget, order: usize) -> WidgetView {
        let scale = self.transform.scale();
        let screen_rect = self.transform.screen_rect(&widget.geometry);
        WidgetView {
            id: widget.id.clone(),
            screen_rect,
            handle_rect: resize_handle_rect(screen_rect),
            z_index: widget.z_index,
            selected: self.selection.is_selected(&widget.id),
            hovered: self.selection.is_hovered(&widget.id),
            unsynced: !self.store.is_synced(&widget.id),
            content: widget.logic.content(scale),
            order,
        }
    }

    fn sort_scene(&mut self) {
        self.scene.sort_by_key(|v| (v.z_index, v.order));
    }

    fn rebuild_scene(&mut self) {
        let scene: Vec<WidgetView> = self
            .store
            .widgets()
            .iter()
            .enumerate()
            .map(|(order, widget)| self.view_for(widget, order))
            .collect();
        self.scene = scene;
        self.sort_scene();
        self.rebuild = false;
        self.dirty.clear();
    }

    fn update_dirty(&mut self) {
        let dirty = std::mem::take(&mut self.dirty);
        for id in &dirty {
            let Some(index) = self.scene.iter().position(|v| &v.id == id) else {
                continue;
            };
            let order = self.scene[index].order;
            if let Some(widget) = self.store.widget(id) {
                let view = self.view_for(widget, order);
                self.scene[index] = view;
            }
        }
        self.sort_scene();
    }
}
