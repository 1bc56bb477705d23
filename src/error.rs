/// Error types for the notification relay
///
/// Errors are converted to appropriate HTTP responses for API clients.
/// Out-of-band delivery failures are deliberately absent here: they are
/// surfaced as a warning on the dispatch receipt, never as an error, because
/// the durable record plus reconnect-time reconciliation is the safety net.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

use crate::registry::RegistryError;
use crate::store::StoreError;

/// Result type for notification-relay operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Session already bound to a different user without an intervening disconnect
    #[error("conflict: {0}")]
    Conflict(String),

    /// Persistence store unavailable; fatal to the operation, nothing partial committed
    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.to_string(),
        }))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Persistence(err.to_string())
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Conflict { .. } => AppError::Conflict(err.to_string()),
            RegistryError::UnknownSession(_) => AppError::NotFound(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SessionId;
    use uuid::Uuid;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Persistence("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_registry_conflict_maps_to_conflict() {
        let err = RegistryError::Conflict {
            session: SessionId::new(),
            bound_to: Uuid::new_v4(),
        };
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
    }
}
