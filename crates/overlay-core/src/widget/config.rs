//! Per-kind widget logic configuration.
//!
//! On the wire `logic_config` is an open JSON object. In memory it is a
//! tagged union keyed by widget kind, each variant with its own fields.
//! Keys a variant does not know are carried in `extra` so they survive a
//! round-trip to the backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ModelError, ModelResult};

/// Default font size in logical points.
pub const DEFAULT_FONT_SIZE: u32 = 36;

/// Font size used for the timer placeholder, in logical points.
const TIMER_LABEL_SIZE: f64 = 36.0;

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// CSS-style hex colour string (`#rgb` or `#rrggbb`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexColor(String);

impl Default for HexColor {
    fn default() -> Self {
        Self("#ffffff".to_string())
    }
}

impl HexColor {
    pub fn new(color: impl Into<String>) -> Self {
        Self(color.into())
    }

    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        Self(format!("#{:02x}{:02x}{:02x}", r, g, b))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into RGB components. Returns `None` for anything that is not a
    /// 3- or 6-digit hex colour.
    pub fn rgb(&self) -> Option<[u8; 3]> {
        let hex = self.0.strip_prefix('#')?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let mut out = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let v = c.to_digit(16)? as u8;
                    out[i] = v * 17;
                }
                Some(out)
            }
            6 => Some([
                u8::from_str_radix(&hex[0..2], 16).ok()?,
                u8::from_str_radix(&hex[2..4], 16).ok()?,
                u8::from_str_radix(&hex[4..6], 16).ok()?,
            ]),
            _ => None,
        }
    }
}

fn default_font_size() -> u32 {
    DEFAULT_FONT_SIZE
}

/// Config for `text` widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextConfig {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub align: TextAlign,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default)]
    pub color: HexColor,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            text: "New text".to_string(),
            align: TextAlign::Left,
            font_size: DEFAULT_FONT_SIZE,
            color: HexColor::default(),
            extra: Map::new(),
        }
    }
}

/// Counting direction of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    #[default]
    CountUp,
    CountDown,
}

/// Config for `timer` widgets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    #[serde(default)]
    pub mode: TimerMode,
    #[serde(default)]
    pub start_seconds: u32,
    #[serde(default)]
    pub color: HexColor,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Typed logic config, one variant per widget kind.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetLogic {
    Text(TextConfig),
    Timer(TimerConfig),
    /// Kinds without a dedicated schema keep their raw config.
    Custom {
        kind: String,
        config: Map<String, Value>,
    },
}

/// What a widget shows inside its box, already scaled to the screen.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetContent {
    Text {
        text: String,
        font_size: f64,
        align: TextAlign,
        color: HexColor,
    },
    Timer {
        label: String,
        font_size: f64,
        color: HexColor,
    },
    Placeholder {
        label: String,
    },
}

/// A stored config key whose value could not be used. The typed field
/// takes its default and the stored value is kept in `extra`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFallback {
    pub key: String,
    pub reason: &'static str,
}

/// Check one known key of a typed config. Unknown keys pass.
fn check_key(kind: &str, key: &str, value: &Value) -> Result<(), &'static str> {
    let ok = match (kind, key) {
        ("text", "text") | (_, "color") => value.is_string(),
        ("text", "align") => serde_json::from_value::<TextAlign>(value.clone()).is_ok(),
        ("text", "fontSize") => value
            .as_u64()
            .is_some_and(|size| size > 0 && size <= u64::from(u32::MAX)),
        ("timer", "mode") => serde_json::from_value::<TimerMode>(value.clone()).is_ok(),
        ("timer", "startSeconds") => value.as_u64().is_some_and(|secs| secs <= u64::from(u32::MAX)),
        _ => return Ok(()),
    };
    if ok {
        return Ok(());
    }
    Err(match key {
        "text" | "color" => "expected a string",
        "align" => "expected left, center or right",
        "fontSize" => "expected a positive integer",
        "mode" => "expected countup or countdown",
        _ => "expected a non-negative integer",
    })
}

impl WidgetLogic {
    /// Decode a stored config for the given kind.
    ///
    /// Never fails: a known key with an unusable value (`fontSize: 0`,
    /// `text: null`, a fractional size) gets its default, and the stored
    /// value moves to `extra` so it is written back unchanged. The keys that
    /// fell back are returned.
    pub fn decode(kind: &str, config: Map<String, Value>) -> (Self, Vec<ConfigFallback>) {
        if !matches!(kind, "text" | "timer") {
            let logic = Self::Custom {
                kind: kind.to_string(),
                config,
            };
            return (logic, Vec::new());
        }

        let original = config.clone();
        let mut usable = config;
        let mut rejected = Map::new();
        let mut fallbacks = Vec::new();
        for (key, value) in &original {
            if let Err(reason) = check_key(kind, key, value) {
                usable.remove(key);
                rejected.insert(key.clone(), value.clone());
                fallbacks.push(ConfigFallback {
                    key: key.clone(),
                    reason,
                });
            }
        }

        let parsed = match kind {
            "text" => parse_config::<TextConfig>(usable).map(|mut config| {
                config.extra.extend(rejected);
                Self::Text(config)
            }),
            _ => parse_config::<TimerConfig>(usable).map(|mut config| {
                config.extra.extend(rejected);
                Self::Timer(config)
            }),
        };
        match parsed {
            Ok(logic) => (logic, fallbacks),
            Err(_) => (
                Self::Custom {
                    kind: kind.to_string(),
                    config: original,
                },
                fallbacks,
            ),
        }
    }

    /// Wire `type` string.
    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Timer(_) => "timer",
            Self::Custom { kind, .. } => kind,
        }
    }

    /// Wire representation of the config. Values kept in `extra` after a
    /// fallback win over the typed default.
    pub fn to_config(&self) -> Map<String, Value> {
        let value = match self {
            Self::Text(config) => serde_json::to_value(config),
            Self::Timer(config) => serde_json::to_value(config),
            Self::Custom { config, .. } => return config.clone(),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Merge changed keys into the config, producing a new config.
    ///
    /// Keys in `changes` overwrite, all other keys are preserved. A changed
    /// key with an unusable value is an error; stored keys that already fell
    /// back stay as they are.
    pub fn merged(&self, changes: &Map<String, Value>) -> ModelResult<Self> {
        let mut config = self.to_config();
        for (key, value) in changes {
            config.insert(key.clone(), value.clone());
        }
        let (logic, fallbacks) = Self::decode(self.kind(), config);
        match fallbacks.iter().find(|f| changes.contains_key(&f.key)) {
            Some(fallback) => Err(ModelError::InvalidConfig {
                kind: self.kind().to_string(),
                reason: format!("{}: {}", fallback.key, fallback.reason),
            }),
            None => Ok(logic),
        }
    }

    /// Content to draw for this widget at the given scale.
    pub fn content(&self, scale: f64) -> WidgetContent {
        match self {
            Self::Text(config) => WidgetContent::Text {
                text: if config.text.is_empty() {
                    "Text".to_string()
                } else {
                    config.text.clone()
                },
                font_size: config.font_size as f64 * scale,
                align: config.align,
                color: config.color.clone(),
            },
            Self::Timer(config) => WidgetContent::Timer {
                label: "⏱ Timer".to_string(),
                font_size: TIMER_LABEL_SIZE * scale,
                color: config.color.clone(),
            },
            Self::Custom { kind, .. } => WidgetContent::Placeholder {
                label: kind.clone(),
            },
        }
    }
}

fn parse_config<T: serde::de::DeserializeOwned>(config: Map<String, Value>) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_text_config_wire_keys() {
        let config = WidgetLogic::Text(TextConfig::default()).to_config();
        assert_eq!(
            Value::Object(config),
            json!({"text": "New text", "align": "left", "fontSize": 36, "color": "#ffffff"})
        );
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let (logic, fallbacks) = WidgetLogic::decode("text", Map::new());
        assert!(fallbacks.is_empty());
        match logic {
            WidgetLogic::Text(config) => {
                assert_eq!(config.text, "");
                assert_eq!(config.font_size, DEFAULT_FONT_SIZE);
                assert_eq!(config.align, TextAlign::Left);
                assert_eq!(config.color, HexColor::default());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_keys_survive_roundtrip() {
        let (logic, _) = WidgetLogic::decode(
            "timer",
            map(json!({"mode": "countdown", "startSeconds": 90, "blink": true})),
        );
        let config = logic.to_config();
        assert_eq!(config["mode"], json!("countdown"));
        assert_eq!(config["startSeconds"], json!(90));
        assert_eq!(config["blink"], json!(true));
    }

    #[test]
    fn test_merge_preserves_other_keys() {
        let logic = WidgetLogic::Text(TextConfig::default());
        let merged = logic.merged(&map(json!({"align": "center"}))).unwrap();
        match merged {
            WidgetLogic::Text(config) => {
                assert_eq!(config.align, TextAlign::Center);
                assert_eq!(config.text, "New text");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_merge_rejects_bad_values() {
        let logic = WidgetLogic::Text(TextConfig::default());
        assert!(logic.merged(&map(json!({"align": "diagonal"}))).is_err());
        assert!(logic.merged(&map(json!({"fontSize": 0}))).is_err());
        assert!(logic.merged(&map(json!({"fontSize": "big"}))).is_err());
        assert!(logic.merged(&map(json!({"text": null}))).is_err());
    }

    #[test]
    fn test_unusable_stored_values_fall_back() {
        let stored = map(json!({"text": null, "fontSize": 0, "align": "left", "color": "#ff0000"}));
        let (logic, fallbacks) = WidgetLogic::decode("text", stored);
        let mut keys: Vec<&str> = fallbacks.iter().map(|f| f.key.as_str()).collect();
        keys.sort();
        assert_eq!(keys, vec!["fontSize", "text"]);
        match &logic {
            WidgetLogic::Text(config) => {
                assert_eq!(config.font_size, DEFAULT_FONT_SIZE);
                assert_eq!(config.text, "");
                assert_eq!(config.color, HexColor::new("#ff0000"));
            }
            other => panic!("unexpected {:?}", other),
        }

        // Stored values go back out untouched.
        let config = logic.to_config();
        assert_eq!(config["fontSize"], json!(0));
        assert_eq!(config["text"], Value::Null);
    }

    #[test]
    fn test_fractional_font_size_falls_back() {
        let (logic, fallbacks) = WidgetLogic::decode("text", map(json!({"text": "Hi", "fontSize": 12.5})));
        assert_eq!(fallbacks.len(), 1);
        match logic.content(0.5) {
            WidgetContent::Text { font_size, text, .. } => {
                assert!((font_size - 18.0).abs() < f64::EPSILON);
                assert_eq!(text, "Hi");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_edit_other_key_keeps_fallback() {
        let (logic, _) = WidgetLogic::decode("text", map(json!({"text": "Hi", "fontSize": 0})));
        let merged = logic.merged(&map(json!({"text": "Bye"}))).unwrap();
        let config = merged.to_config();
        assert_eq!(config["text"], json!("Bye"));
        assert_eq!(config["fontSize"], json!(0));

        let fixed = merged.merged(&map(json!({"fontSize": 48}))).unwrap();
        match fixed {
            WidgetLogic::Text(config) => {
                assert_eq!(config.font_size, 48);
                assert!(config.extra.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_custom_accepts_anything() {
        let (logic, _) = WidgetLogic::decode("chat", map(json!({"channel": "x", "rows": 5})));
        assert_eq!(logic.kind(), "chat");
        let merged = logic.merged(&map(json!({"rows": 7}))).unwrap();
        assert_eq!(merged.to_config()["rows"], json!(7));
        assert_eq!(merged.to_config()["channel"], json!("x"));
    }

    #[test]
    fn test_content_scales_font() {
        let logic = WidgetLogic::Text(TextConfig::default());
        match logic.content(0.5) {
            WidgetContent::Text { font_size, text, .. } => {
                assert!((font_size - 18.0).abs() < f64::EPSILON);
                assert_eq!(text, "New text");
            }
            other => panic!("unexpected {:?}", other),
        }
        match WidgetLogic::Timer(TimerConfig::default()).content(2.0) {
            WidgetContent::Timer { font_size, .. } => assert!((font_size - 72.0).abs() < f64::EPSILON),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_hex_color_parsing() {
        assert_eq!(HexColor::new("#ffffff").rgb(), Some([255, 255, 255]));
        assert_eq!(HexColor::new("#1a2B3c").rgb(), Some([0x1a, 0x2b, 0x3c]));
        assert_eq!(HexColor::new("#fff").rgb(), Some([255, 255, 255]));
        assert_eq!(HexColor::new("#f0a").rgb(), Some([255, 0, 170]));
        assert_eq!(HexColor::new("white").rgb(), None);
        assert_eq!(HexColor::new("#ffé").rgb(), None);
        assert_eq!(HexColor::from_rgb([1, 2, 255]).as_str(), "#0102ff");
    }
}
