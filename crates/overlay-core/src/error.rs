//! Editor-level errors.

use thiserror::Error;

use crate::gateway::GatewayError;
use crate::widget::ModelError;

/// Errors surfaced to the editor host.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditorError {
    #[error("{0}")]
    Load(GatewayError),
    #[error("{0}")]
    Create(GatewayError),
    /// The backend refused the credentials. The host should send the user
    /// back through sign-in.
    #[error("Not authenticated: {0}")]
    Unauthenticated(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl EditorError {
    /// Wrap a failed load, lifting auth failures out.
    pub fn load(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized(detail) => Self::Unauthenticated(detail),
            other => Self::Load(other),
        }
    }

    /// Wrap a failed create, lifting auth failures out.
    pub fn create(err: GatewayError) -> Self {
        match err {
            GatewayError::Unauthorized(detail) => Self::Unauthenticated(detail),
            other => Self::Create(other),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated(_))
    }
}

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_are_lifted() {
        let err = EditorError::load(GatewayError::Unauthorized("expired".into()));
        assert!(err.is_unauthenticated());
        assert_eq!(err.to_string(), "Not authenticated: expired");

        let err = EditorError::create(GatewayError::Rejected {
            status: 422,
            detail: "bad type".into(),
        });
        assert!(!err.is_unauthenticated());
        assert_eq!(err.to_string(), "bad type");
    }
}
