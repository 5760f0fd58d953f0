//! Application-wide error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// A single offending input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears in the request payload.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Access denied.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {message}")]
    Validation {
        /// Summary message.
        message: String,
        /// Offending fields, if known.
        fields: Vec<FieldError>,
    },

    /// Conflict (e.g., duplicate entry).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Optimistic write lost a race; the client may retry.
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Serialized shape of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Offending fields, empty unless the error is a validation failure.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl AppError {
    /// Creates a validation error without field details.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Validation { .. } => 400,
            Self::Conflict(_) | Self::ConcurrentModification(_) => 409,
            Self::Database(_) | Self::ExternalService(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the client may safely repeat the request.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification(_))
    }

    /// Builds the response body.
    ///
    /// Infrastructure failures never leak their detail to the client.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let (message, fields) = match self {
            Self::Validation { message, fields } => (message.clone(), fields.clone()),
            Self::Database(_) | Self::Internal(_) | Self::ExternalService(_) => {
                ("An internal error occurred".to_string(), Vec::new())
            }
            Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::ConcurrentModification(m) => (m.clone(), Vec::new()),
        };

        ErrorBody {
            error: self.error_code().to_string(),
            message,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AppError::Unauthorized(String::new()).status_code(), 401);
        assert_eq!(AppError::Forbidden(String::new()).status_code(), 403);
        assert_eq!(AppError::NotFound(String::new()).status_code(), 404);
        assert_eq!(AppError::validation("").status_code(), 400);
        assert_eq!(AppError::Conflict(String::new()).status_code(), 409);
        assert_eq!(
            AppError::ConcurrentModification(String::new()).status_code(),
            409
        );
        assert_eq!(AppError::Database(String::new()).status_code(), 500);
        assert_eq!(AppError::ExternalService(String::new()).status_code(), 500);
        assert_eq!(AppError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::Unauthorized(String::new()).error_code(),
            "UNAUTHORIZED"
        );
        assert_eq!(AppError::Forbidden(String::new()).error_code(), "FORBIDDEN");
        assert_eq!(AppError::NotFound(String::new()).error_code(), "NOT_FOUND");
        assert_eq!(AppError::validation("").error_code(), "VALIDATION_ERROR");
        assert_eq!(AppError::Conflict(String::new()).error_code(), "CONFLICT");
        assert_eq!(
            AppError::ConcurrentModification(String::new()).error_code(),
            "CONCURRENT_MODIFICATION"
        );
        assert_eq!(
            AppError::Internal(String::new()).error_code(),
            "INTERNAL_ERROR"
        );
    }

    #[test]
    fn test_only_concurrency_is_retryable() {
        assert!(AppError::ConcurrentModification("budget".into()).is_retryable());
        assert!(!AppError::Conflict("budget".into()).is_retryable());
        assert!(!AppError::Internal("boom".into()).is_retryable());
    }

    #[test]
    fn test_validation_body_carries_fields() {
        let err = AppError::Validation {
            message: "invalid expense".into(),
            fields: vec![FieldError::new("amount", "must be a number")],
        };
        let body = err.body();

        assert_eq!(body.error, "VALIDATION_ERROR");
        assert_eq!(body.message, "invalid expense");
        assert_eq!(body.fields, vec![FieldError::new("amount", "must be a number")]);
    }

    #[test]
    fn test_internal_body_hides_detail() {
        let body = AppError::Database("connection refused on 10.0.0.3".into()).body();
        assert_eq!(body.error, "DATABASE_ERROR");
        assert!(!body.message.contains("10.0.0.3"));
        assert!(body.fields.is_empty());
    }

    #[test]
    fn test_body_omits_empty_fields_when_serialized() {
        let json = serde_json::to_value(AppError::NotFound("budget".into()).body()).unwrap();
        assert!(json.get("fields").is_none());
        assert_eq!(json["error"], "NOT_FOUND");
    }
}
