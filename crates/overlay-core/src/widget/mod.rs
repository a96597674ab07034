//! Widget model for overlay compositions.
//!
//! A widget is a positioned, typed, configurable rectangle inside an overlay:
//! - Geometry in logical overlay pixels, with enforced minimums
//! - A typed logic config per widget kind
//! - Free-form cosmetic overrides
//!
//! Widgets are pure data. Selection and gesture state live elsewhere.

mod config;
mod geometry;
mod handles;
mod patch;
mod record;

pub use config::{
    ConfigFallback, HexColor, TextAlign, TextConfig, TimerConfig, TimerMode, WidgetContent, WidgetLogic,
};
pub use geometry::{Geometry, MIN_HEIGHT, MIN_WIDTH};
pub use handles::{RESIZE_HANDLE_SIZE, resize_handle_rect};
pub use patch::{WidgetField, WidgetPatch};
pub use record::{CreatedWidget, ErrorBody, PatchBody, WidgetDraft, WidgetRecord};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Default logical position for newly created widgets.
pub const DEFAULT_POSITION: (i32, i32) = (50, 50);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an id from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        // Backends hand out either numeric or string ids.
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                #[derive(Deserialize)]
                #[serde(untagged)]
                enum Raw {
                    Text(String),
                    Signed(i64),
                    Unsigned(u64),
                }

                Ok(match Raw::deserialize(deserializer)? {
                    Raw::Text(id) => Self(id),
                    Raw::Signed(id) => Self(id.to_string()),
                    Raw::Unsigned(id) => Self(id.to_string()),
                })
            }
        }
    };
}

string_id! {
    /// Server-assigned widget identifier.
    WidgetId
}

string_id! {
    /// Overlay identifier.
    OverlayId
}

/// Widget model errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Invalid {kind} config: {reason}")]
    InvalidConfig { kind: String, reason: String },
    #[error("Unknown widget: {0}")]
    UnknownWidget(WidgetId),
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// The kind of a widget, which selects its config schema and renderer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    Text,
    Timer,
    /// Any kind this editor has no dedicated config for.
    Other(String),
}

impl WidgetKind {
    /// Parse a wire `type` string.
    pub fn parse(kind: &str) -> Self {
        match kind {
            "text" => Self::Text,
            "timer" => Self::Timer,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire `type` string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Timer => "timer",
            Self::Other(kind) => kind,
        }
    }

    /// Default size (width, height) for a new widget of this kind.
    pub fn default_size(&self) -> (i32, i32) {
        match self {
            Self::Text => (400, 100),
            Self::Timer | Self::Other(_) => (300, 100),
        }
    }

    /// Default logic config for a new widget of this kind.
    pub fn default_logic(&self) -> WidgetLogic {
        match self {
            Self::Text => WidgetLogic::Text(TextConfig::default()),
            Self::Timer => WidgetLogic::Timer(TimerConfig::default()),
            Self::Other(kind) => WidgetLogic::Custom {
                kind: kind.clone(),
                config: Map::new(),
            },
        }
    }

    /// Build the create-request body for a new widget of this kind.
    pub fn draft(&self, overlay_id: &OverlayId, z_index: i32) -> WidgetDraft {
        let (width, height) = self.default_size();
        let (x, y) = DEFAULT_POSITION;
        WidgetDraft {
            overlay_id: overlay_id.clone(),
            kind: self.as_str().to_string(),
            x,
            y,
            width,
            height,
            z_index,
            logic_config: self.default_logic().to_config(),
            cosmetic_overrides: Map::new(),
        }
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One widget as held by the editor.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub id: WidgetId,
    pub overlay_id: OverlayId,
    pub geometry: Geometry,
    /// Stacking order; assigned at creation as the widget count.
    pub z_index: i32,
    pub logic: WidgetLogic,
    pub cosmetic_overrides: Map<String, Value>,
}

impl Widget {
    /// Build a widget from a backend record.
    ///
    /// Out-of-range geometry is clamped. Config keys with unusable values
    /// render with their defaults and are written back as stored.
    pub fn from_record(record: WidgetRecord) -> Self {
        let WidgetRecord { id, draft } = record;
        let raw = Geometry {
            x: draft.x,
            y: draft.y,
            width: draft.width,
            height: draft.height,
        };
        let geometry = raw.clamped();
        if !raw.is_valid() {
            log::warn!("Widget {} has out-of-range geometry {:?}, clamped", id, raw);
        }

        let (logic, fallbacks) = WidgetLogic::decode(&draft.kind, draft.logic_config);
        for fallback in &fallbacks {
            log::warn!(
                "Widget {}: {} config key {} is unusable ({}), using the default",
                id,
                draft.kind,
                fallback.key,
                fallback.reason
            );
        }

        Self {
            id,
            overlay_id: draft.overlay_id,
            geometry,
            z_index: draft.z_index,
            logic,
            cosmetic_overrides: draft.cosmetic_overrides,
        }
    }

    /// Convert back into the wire record.
    pub fn to_record(&self) -> WidgetRecord {
        WidgetRecord {
            id: self.id.clone(),
            draft: WidgetDraft {
                overlay_id: self.overlay_id.clone(),
                kind: self.kind().to_string(),
                x: self.geometry.x,
                y: self.geometry.y,
                width: self.geometry.width,
                height: self.geometry.height,
                z_index: self.z_index,
                logic_config: self.logic.to_config(),
                cosmetic_overrides: self.cosmetic_overrides.clone(),
            },
        }
    }

    /// Wire `type` string.
    pub fn kind(&self) -> &str {
        self.logic.kind()
    }

    /// Apply a partial update.
    ///
    /// Geometry is clamped to the widget invariants. Config maps are merged
    /// key by key. The update is all-or-nothing: an invalid config leaves the
    /// widget untouched. Returns the wire `updates` object describing the
    /// applied values.
    pub fn apply(&mut self, patch: &WidgetPatch) -> ModelResult<Map<String, Value>> {
        let logic = match &patch.logic_config {
            Some(changes) => Some(self.logic.merged(changes)?),
            None => None,
        };

        let mut geometry = self.geometry;
        if let Some(x) = patch.x {
            geometry.x = x;
        }
        if let Some(y) = patch.y {
            geometry.y = y;
        }
        if let Some(width) = patch.width {
            geometry.width = width;
        }
        if let Some(height) = patch.height {
            geometry.height = height;
        }
        self.geometry = geometry.clamped();

        if let Some(z_index) = patch.z_index {
            self.z_index = z_index;
        }
        if let Some(logic) = logic {
            self.logic = logic;
        }
        if let Some(changes) = &patch.cosmetic_overrides {
            for (key, value) in changes {
                self.cosmetic_overrides.insert(key.clone(), value.clone());
            }
        }

        Ok(self.field_values(&patch.fields()))
    }

    /// Current wire value of one field.
    pub fn field_value(&self, field: WidgetField) -> Value {
        match field {
            WidgetField::X => Value::from(self.geometry.x),
            WidgetField::Y => Value::from(self.geometry.y),
            WidgetField::Width => Value::from(self.geometry.width),
            WidgetField::Height => Value::from(self.geometry.height),
            WidgetField::ZIndex => Value::from(self.z_index),
            WidgetField::LogicConfig => Value::Object(self.logic.to_config()),
            WidgetField::CosmeticOverrides => Value::Object(self.cosmetic_overrides.clone()),
        }
    }

    /// Wire `updates` object with the current values of the given fields.
    pub fn field_values(&self, fields: &[WidgetField]) -> Map<String, Value> {
        fields
            .iter()
            .map(|&field| (field.key().to_string(), self.field_value(field)))
            .collect()
    }
}
