//! Partial widget updates.

use serde_json::{Map, Value};

/// A widget field that can be changed by a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WidgetField {
    X,
    Y,
    Width,
    Height,
    ZIndex,
    LogicConfig,
    CosmeticOverrides,
}

impl WidgetField {
    /// All fields, in wire order.
    pub const ALL: [WidgetField; 7] = [
        Self::X,
        Self::Y,
        Self::Width,
        Self::Height,
        Self::ZIndex,
        Self::LogicConfig,
        Self::CosmeticOverrides,
    ];

    /// Wire key of the field.
    pub fn key(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Width => "width",
            Self::Height => "height",
            Self::ZIndex => "z_index",
            Self::LogicConfig => "logic_config",
            Self::CosmeticOverrides => "cosmetic_overrides",
        }
    }

    /// Look a field up by wire key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Whether the field is part of the widget's geometry.
    pub fn is_geometry(&self) -> bool {
        matches!(self, Self::X | Self::Y | Self::Width | Self::Height)
    }
}

/// A partial update to one widget.
///
/// Geometry fields replace the current value. `logic_config` and
/// `cosmetic_overrides` are merged key by key into the existing maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetPatch {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub z_index: Option<i32>,
    pub logic_config: Option<Map<String, Value>>,
    pub cosmetic_overrides: Option<Map<String, Value>>,
}

impl WidgetPatch {
    /// Move to a new position.
    pub fn position(x: i32, y: i32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    /// Change the size.
    pub fn size(width: i32, height: i32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    /// Set one logic config key.
    pub fn config(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut changes = Map::new();
        changes.insert(key.into(), value.into());
        Self {
            logic_config: Some(changes),
            ..Default::default()
        }
    }

    /// Set one cosmetic override key.
    pub fn cosmetic(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut changes = Map::new();
        changes.insert(key.into(), value.into());
        Self {
            cosmetic_overrides: Some(changes),
            ..Default::default()
        }
    }

    /// Set a single integer field. Config fields are ignored.
    pub fn field(field: WidgetField, value: i32) -> Self {
        let mut patch = Self::default();
        match field {
            WidgetField::X => patch.x = Some(value),
            WidgetField::Y => patch.y = Some(value),
            WidgetField::Width => patch.width = Some(value),
            WidgetField::Height => patch.height = Some(value),
            WidgetField::ZIndex => patch.z_index = Some(value),
            WidgetField::LogicConfig | WidgetField::CosmeticOverrides => {}
        }
        patch
    }

    /// Fields this patch touches, in wire order.
    pub fn fields(&self) -> Vec<WidgetField> {
        let mut fields = Vec::new();
        if self.x.is_some() {
            fields.push(WidgetField::X);
        }
        if self.y.is_some() {
            fields.push(WidgetField::Y);
        }
        if self.width.is_some() {
            fields.push(WidgetField::Width);
        }
        if self.height.is_some() {
            fields.push(WidgetField::Height);
        }
        if self.z_index.is_some() {
            fields.push(WidgetField::ZIndex);
        }
        if self.logic_config.is_some() {
            fields.push(WidgetField::LogicConfig);
        }
        if self.cosmetic_overrides.is_some() {
            fields.push(WidgetField::CosmeticOverrides);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    pub fn touches_geometry(&self) -> bool {
        self.fields().iter().any(WidgetField::is_geometry)
    }

    pub fn touches_config(&self) -> bool {
        self.logic_config.is_some() || self.cosmetic_overrides.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_in_wire_order() {
        let mut patch = WidgetPatch::config("text", "a");
        patch.y = Some(1);
        patch.x = Some(2);
        assert_eq!(
            patch.fields(),
            vec![WidgetField::X, WidgetField::Y, WidgetField::LogicConfig]
        );
        assert!(patch.touches_geometry());
        assert!(patch.touches_config());
    }

    #[test]
    fn test_field_keys_roundtrip() {
        for field in WidgetField::ALL {
            assert_eq!(WidgetField::from_key(field.key()), Some(field));
        }
        assert_eq!(WidgetField::from_key("id"), None);
    }

    #[test]
    fn test_single_field_patch() {
        assert_eq!(WidgetPatch::field(WidgetField::Width, 90), WidgetPatch { width: Some(90), ..Default::default() });
        assert!(WidgetPatch::field(WidgetField::LogicConfig, 1).is_empty());
    }
}
