//! Persistence backend abstraction.
//!
//! The editor talks to its backend through [`PersistenceGateway`]: list the
//! widgets of an overlay, create a widget, patch a widget. The HTTP client
//! lives behind the `http` feature; [`MemoryGateway`] serves tests and
//! offline use.

mod config;
#[cfg(feature = "http")]
mod http;
mod memory;

pub use config::{
    DEFAULT_BACKEND_URL, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, GatewayConfig, env_parse,
};
#[cfg(feature = "http")]
pub use http::HttpGateway;
pub use memory::{GatewayOp, MemoryGateway};

use crate::widget::{OverlayId, PatchBody, WidgetDraft, WidgetId, WidgetRecord};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Fallback message when a failed list carries no detail.
pub const LOAD_FAILED: &str = "Failed to load widgets";
/// Fallback message when a failed create carries no detail.
pub const CREATE_FAILED: &str = "Failed to create widget";
/// Fallback message when a failed patch carries no detail.
pub const UPDATE_FAILED: &str = "Failed to update widget";

/// Gateway errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// 401/403: the bearer token was missing, expired or refused.
    #[error("{0}")]
    Unauthorized(String),
    /// Any other 4xx. Retrying will not help.
    #[error("{detail}")]
    Rejected { status: u16, detail: String },
    /// 5xx.
    #[error("{detail}")]
    Server { status: u16, detail: String },
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Transport(String),
    /// The response body could not be understood.
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 | 403 => Self::Unauthorized(detail),
            500..=599 => Self::Server { status, detail },
            _ => Self::Rejected { status, detail },
        }
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Server { .. } | Self::Transport(_))
    }

    /// HTTP status, when the failure came with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Boxed future returned by gateway methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Backend API for loading, creating and patching widgets.
pub trait PersistenceGateway: Send + Sync {
    /// Fetch every widget of an overlay.
    fn list_widgets(&self, overlay_id: &OverlayId) -> BoxFuture<'_, GatewayResult<Vec<WidgetRecord>>>;

    /// Create a widget. Returns the server-assigned id.
    fn create_widget(&self, draft: &WidgetDraft) -> BoxFuture<'_, GatewayResult<WidgetId>>;

    /// Apply a partial update to one widget.
    fn patch_widget(&self, body: &PatchBody) -> BoxFuture<'_, GatewayResult<()>>;
}

impl<G: PersistenceGateway + ?Sized> PersistenceGateway for Arc<G> {
    fn list_widgets(&self, overlay_id: &OverlayId) -> BoxFuture<'_, GatewayResult<Vec<WidgetRecord>>> {
        (**self).list_widgets(overlay_id)
    }

    fn create_widget(&self, draft: &WidgetDraft) -> BoxFuture<'_, GatewayResult<WidgetId>> {
        (**self).create_widget(draft)
    }

    fn patch_widget(&self, body: &PatchBody) -> BoxFuture<'_, GatewayResult<()>> {
        (**self).patch_widget(body)
    }
}
