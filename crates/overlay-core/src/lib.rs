//! Overlay Editor Core Library
//!
//! Platform-agnostic core of the overlay editor canvas: widgets positioned in
//! a fixed logical resolution, edited through drag and resize gestures and
//! kept in sync with a persistence backend without blocking the UI.

pub mod canvas;
pub mod error;
pub mod gateway;
pub mod input;
pub mod interaction;
pub mod selection;
pub mod store;
pub mod transform;
pub mod widget;

pub use canvas::{CanvasRenderer, HitTarget, WidgetView};
pub use error::{EditorError, EditorResult};
#[cfg(feature = "http")]
pub use gateway::HttpGateway;
pub use gateway::{GatewayConfig, GatewayError, GatewayResult, MemoryGateway, PersistenceGateway};
pub use input::{MouseButton, PointerEvent};
pub use interaction::{GeometryUpdate, InteractionController, InteractionMode, InteractionSession, InteractionState};
pub use selection::Selection;
pub use store::{LoadState, OptimisticStore, StoreEvent, SyncConfig, SyncEvent};
pub use transform::{CanvasTransform, DEFAULT_RESOLUTION, compute_scale, to_logical, to_screen};
pub use widget::{
    Geometry, HexColor, ModelError, OverlayId, TextAlign, Widget, WidgetContent, WidgetField, WidgetId, WidgetKind,
    WidgetLogic, WidgetPatch,
};
