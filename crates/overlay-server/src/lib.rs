//! Overlay Editor Development Backend
//!
//! An in-memory implementation of the widget persistence API used by the
//! editor's HTTP gateway.
//!
//! ## Routes
//!
//! ```text
//! GET   /overlays/{overlay_id}/widgets   list an overlay's widgets in creation order
//! POST  /widgets                         create a widget, returns {"id": "<uuid>"}
//! PATCH /widgets/{widget_id}             shallow-merge {"widget_id", "updates"}
//! GET   /health                          liveness check, no auth
//! ```
//!
//! Every route except `/health` needs `Authorization: Bearer <token>`.
//! Errors are returned as `{"detail": "..."}`.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Json, Router,
    extract::{Path, Request, State, rejection::JsonRejection},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use dashmap::DashMap;
use overlay_core::gateway::env_parse;
use overlay_core::widget::{CreatedWidget, ErrorBody, PatchBody, WidgetDraft, WidgetRecord};
use overlay_core::{OverlayId, WidgetId};
use serde_json::{Map, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8000;

/// Split a comma-separated token list. Empty entries are dropped; an empty
/// list means no token restriction.
pub fn parse_tokens(raw: &str) -> Option<HashSet<String>> {
    let tokens: HashSet<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect();
    (!tokens.is_empty()).then_some(tokens)
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Accepted bearer tokens. `None` accepts any non-empty token.
    pub tokens: Option<HashSet<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            tokens: None,
        }
    }
}

impl ServerConfig {
    /// Load from `OVERLAY_SERVER_ADDR` and `OVERLAY_SERVER_TOKENS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            addr: env_parse("OVERLAY_SERVER_ADDR", defaults.addr),
            tokens: std::env::var("OVERLAY_SERVER_TOKENS")
                .ok()
                .and_then(|raw| parse_tokens(&raw)),
        }
    }
}

/// Handler error, rendered as `(status, {"detail": ...})`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ApiError::Unauthorized(detail) | ApiError::BadRequest(detail) | ApiError::NotFound(detail) => detail,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            detail: self.detail().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// A stored widget plus its insertion sequence, which orders listings.
#[derive(Debug, Clone)]
struct StoredWidget {
    seq: u64,
    record: WidgetRecord,
}

/// Shared application state
pub struct AppState {
    widgets: DashMap<WidgetId, StoredWidget>,
    next_seq: AtomicU64,
    tokens: Option<HashSet<String>>,
}

impl AppState {
    pub fn new(tokens: Option<HashSet<String>>) -> Self {
        Self {
            widgets: DashMap::new(),
            next_seq: AtomicU64::new(0),
            tokens,
        }
    }

    /// Check an `Authorization` header value.
    pub fn authorize(&self, header: Option<&str>) -> Result<(), ApiError> {
        let token = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

        match &self.tokens {
            Some(tokens) if !tokens.contains(token) => Err(ApiError::Unauthorized("Invalid token".to_string())),
            _ => Ok(()),
        }
    }

    /// Widgets of one overlay, oldest first.
    pub fn list(&self, overlay_id: &OverlayId) -> Vec<WidgetRecord> {
        let mut stored: Vec<StoredWidget> = self
            .widgets
            .iter()
            .filter(|entry| entry.record.draft.overlay_id == *overlay_id)
            .map(|entry| entry.value().clone())
            .collect();
        stored.sort_by_key(|widget| widget.seq);
        stored.into_iter().map(|widget| widget.record).collect()
    }

    /// Store a new widget under a fresh UUID.
    pub fn create(&self, draft: WidgetDraft) -> Result<WidgetId, ApiError> {
        if draft.kind.trim().is_empty() {
            return Err(ApiError::BadRequest("Widget type is required".to_string()));
        }
        let id = WidgetId::new(Uuid::new_v4().to_string());
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let record = WidgetRecord { id: id.clone(), draft };
        self.widgets.insert(id.clone(), StoredWidget { seq, record });
        Ok(id)
    }

    /// Apply a patch body to the widget at `path_id`.
    pub fn patch(&self, path_id: &WidgetId, body: PatchBody) -> Result<WidgetRecord, ApiError> {
        if body.widget_id != *path_id {
            return Err(ApiError::BadRequest("widget_id does not match the URL".to_string()));
        }
        let mut entry = self
            .widgets
            .get_mut(path_id)
            .ok_or_else(|| ApiError::NotFound("Widget not found".to_string()))?;
        let merged = merge_updates(&entry.record, &body.updates)?;
        entry.record = merged.clone();
        Ok(merged)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

/// Overwrite top-level record keys with `updates`. The id is immutable.
fn merge_updates(record: &WidgetRecord, updates: &Map<String, Value>) -> Result<WidgetRecord, ApiError> {
    let invalid = |e: serde_json::Error| ApiError::BadRequest(format!("Invalid updates: {}", e));
    let mut fields = match serde_json::to_value(record).map_err(invalid)? {
        Value::Object(fields) => fields,
        _ => return Err(ApiError::BadRequest("Invalid widget record".to_string())),
    };
    for (key, value) in updates {
        if key != "id" {
            fields.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(Value::Object(fields)).map_err(invalid)
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/overlays/{overlay_id}/widgets", get(list_widgets))
        .route("/widgets", post(create_widget))
        .route("/widgets/{widget_id}", patch(patch_widget))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

async fn require_bearer(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if let Err(err) = state.authorize(header) {
        debug!("Rejected {} {}: {}", request.method(), request.uri().path(), err.detail());
        return Err(err);
    }
    Ok(next.run(request).await)
}

async fn list_widgets(State(state): State<Arc<AppState>>, Path(overlay_id): Path<String>) -> Json<Vec<WidgetRecord>> {
    Json(state.list(&OverlayId::new(overlay_id)))
}

async fn create_widget(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<WidgetDraft>, JsonRejection>,
) -> Result<Json<CreatedWidget>, ApiError> {
    let Json(draft) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let overlay_id = draft.overlay_id.clone();
    let kind = draft.kind.clone();
    let id = state.create(draft)?;
    info!("Created {} widget {} in overlay {}", kind, id, overlay_id);
    Ok(Json(CreatedWidget { id }))
}

async fn patch_widget(
    State(state): State<Arc<AppState>>,
    Path(widget_id): Path<String>,
    payload: Result<Json<PatchBody>, JsonRejection>,
) -> Result<Json<WidgetRecord>, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let keys: Vec<String> = body.updates.keys().cloned().collect();
    match state.patch(&WidgetId::new(widget_id), body) {
        Ok(record) => {
            debug!("Patched widget {}: {:?}", record.id, keys);
            Ok(Json(record))
        }
        Err(err) => {
            warn!("Patch rejected: {}", err.detail());
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_core::WidgetKind;
    use serde_json::json;

    fn state() -> AppState {
        AppState::new(None)
    }

    fn draft(overlay: &str, kind: WidgetKind, z: i32) -> WidgetDraft {
        kind.draft(&OverlayId::new(overlay), z)
    }

    fn updates(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_from_env_reads_addr() {
        unsafe { std::env::set_var("OVERLAY_SERVER_ADDR", "127.0.0.1:9123") };
        let config = ServerConfig::from_env();
        unsafe { std::env::remove_var("OVERLAY_SERVER_ADDR") };
        assert_eq!(config.addr, SocketAddr::from(([127, 0, 0, 1], 9123)));
        assert_eq!(ServerConfig::from_env().addr, ServerConfig::default().addr);
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!(parse_tokens(""), None);
        assert_eq!(parse_tokens(" , "), None);
        let tokens = parse_tokens("alpha, beta,,").unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.contains("alpha"));
        assert!(tokens.contains("beta"));
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.addr.port(), DEFAULT_PORT);
        assert!(config.tokens.is_none());
    }

    #[test]
    fn test_authorize_without_token_list() {
        let state = state();
        assert!(state.authorize(Some("Bearer anything")).is_ok());
        assert!(matches!(state.authorize(None), Err(ApiError::Unauthorized(_))));
        assert!(matches!(state.authorize(Some("Bearer  ")), Err(ApiError::Unauthorized(_))));
        assert!(matches!(state.authorize(Some("Basic abc")), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_authorize_with_token_list() {
        let state = AppState::new(parse_tokens("secret"));
        assert!(state.authorize(Some("Bearer secret")).is_ok());
        assert_eq!(
            state.authorize(Some("Bearer other")),
            Err(ApiError::Unauthorized("Invalid token".to_string()))
        );
    }

    #[test]
    fn test_list_filters_by_overlay_in_creation_order() {
        let state = state();
        let first = state.create(draft("ov-1", WidgetKind::Text, 0)).unwrap();
        state.create(draft("ov-2", WidgetKind::Text, 0)).unwrap();
        let second = state.create(draft("ov-1", WidgetKind::Timer, 1)).unwrap();

        let listed: Vec<WidgetId> = state.list(&OverlayId::new("ov-1")).into_iter().map(|r| r.id).collect();
        assert_eq!(listed, vec![first, second]);
        assert_eq!(state.len(), 3);
        assert!(state.list(&OverlayId::new("ov-3")).is_empty());
    }

    #[test]
    fn test_created_ids_are_uuids() {
        let state = state();
        let id = state.create(draft("ov", WidgetKind::Text, 0)).unwrap();
        assert!(Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn test_create_requires_type() {
        let state = state();
        let mut draft = draft("ov", WidgetKind::Text, 0);
        draft.kind = " ".to_string();
        assert!(matches!(state.create(draft), Err(ApiError::BadRequest(_))));
        assert!(state.is_empty());
    }

    #[test]
    fn test_patch_is_shallow_merge() {
        let state = state();
        let id = state.create(draft("ov", WidgetKind::Text, 0)).unwrap();
        let body = PatchBody {
            widget_id: id.clone(),
            updates: updates(json!({ "x": 500, "logic_config": { "text": "Hi" } })),
        };
        let record = state.patch(&id, body).unwrap();
        assert_eq!(record.draft.x, 500);
        assert_eq!(record.draft.y, 50);
        assert_eq!(record.draft.logic_config, updates(json!({ "text": "Hi" })));
        assert_eq!(state.list(&OverlayId::new("ov"))[0], record);
    }

    #[test]
    fn test_patch_cannot_change_id() {
        let state = state();
        let id = state.create(draft("ov", WidgetKind::Text, 0)).unwrap();
        let body = PatchBody {
            widget_id: id.clone(),
            updates: updates(json!({ "id": "other", "y": 7 })),
        };
        let record = state.patch(&id, body).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.draft.y, 7);
    }

    #[test]
    fn test_patch_rejects_mismatched_id() {
        let state = state();
        let id = state.create(draft("ov", WidgetKind::Text, 0)).unwrap();
        let body = PatchBody {
            widget_id: WidgetId::new("someone-else"),
            updates: updates(json!({ "x": 1 })),
        };
        let err = state.patch(&id, body).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_patch_unknown_widget() {
        let state = state();
        let id = WidgetId::new("missing");
        let body = PatchBody {
            widget_id: id.clone(),
            updates: Map::new(),
        };
        assert_eq!(
            state.patch(&id, body),
            Err(ApiError::NotFound("Widget not found".to_string()))
        );
    }

    #[test]
    fn test_patch_with_invalid_value_keeps_record() {
        let state = state();
        let id = state.create(draft("ov", WidgetKind::Text, 0)).unwrap();
        let body = PatchBody {
            widget_id: id.clone(),
            updates: updates(json!({ "x": "left" })),
        };
        assert!(matches!(state.patch(&id, body), Err(ApiError::BadRequest(_))));
        assert_eq!(state.list(&OverlayId::new("ov"))[0].draft.x, 50);
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiError::Unauthorized(String::new()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::BadRequest(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotFound(String::new()).status(), StatusCode::NOT_FOUND);
    }
}
