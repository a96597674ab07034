//! Wire records exchanged with the persistence backend.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{OverlayId, WidgetId};

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `POST /widgets`: every widget field except the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDraft {
    pub overlay_id: OverlayId,
    #[serde(rename = "type")]
    pub kind: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub z_index: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logic_config: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cosmetic_overrides: Map<String, Value>,
}

/// A stored widget as returned by `GET /overlays/{id}/widgets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetRecord {
    pub id: WidgetId,
    #[serde(flatten)]
    pub draft: WidgetDraft,
}

/// Response of `POST /widgets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedWidget {
    pub id: WidgetId,
}

/// Body of `PATCH /widgets/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchBody {
    pub widget_id: WidgetId,
    pub updates: Map<String, Value>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_parses_backend_shape() {
        let record: WidgetRecord = serde_json::from_value(json!({
            "id": 7,
            "overlay_id": "ov-1",
            "type": "text",
            "x": 10, "y": 20, "width": 400, "height": 100,
            "z_index": null,
            "logic_config": {"text": "hi"},
            "cosmetic_overrides": null
        }))
        .unwrap();
        assert_eq!(record.id.as_str(), "7");
        assert_eq!(record.draft.kind, "text");
        assert_eq!(record.draft.z_index, 0);
        assert!(record.draft.cosmetic_overrides.is_empty());
        assert_eq!(record.draft.logic_config["text"], json!("hi"));
    }

    #[test]
    fn test_draft_serializes_create_body() {
        let draft = crate::widget::WidgetKind::Timer.draft(&OverlayId::new("ov"), 2);
        let body = serde_json::to_value(&draft).unwrap();
        assert_eq!(body["overlay_id"], json!("ov"));
        assert_eq!(body["type"], json!("timer"));
        assert_eq!(body["z_index"], json!(2));
        assert_eq!(body["cosmetic_overrides"], json!({}));
    }
}
