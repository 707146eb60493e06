//! Error handling module for the queue store.
//!
//! Provides the error taxonomy shared by the store, the session manager and the
//! ticket engine, with stable error codes and a failure envelope.

use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const STATE_CONFLICT: &str = "STATE_CONFLICT";
    pub const OWNERSHIP_ERROR: &str = "OWNERSHIP_ERROR";
    pub const INVALID_CREDENTIALS: &str = "INVALID_CREDENTIALS";
    pub const WRONG_PASSWORD: &str = "WRONG_PASSWORD";
    pub const ROLE_MISMATCH: &str = "ROLE_MISMATCH";
    pub const VERSION_MISMATCH: &str = "VERSION_MISMATCH";
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Bad input shape or range
    Validation(String),
    /// Unknown ticket, user or worker
    NotFound(String),
    /// Operation invalid for the current ticket or worker state
    StateConflict(String),
    /// Ticket does not belong to the requesting user
    Ownership(String),
    /// No account for the given email
    InvalidCredentials(String),
    /// Account exists but the password does not match
    WrongPassword(String),
    /// Account role differs from the one the caller expected
    RoleMismatch(String),
    /// Optimistic concurrency conflict on a storage write
    Conflict {
        message: String,
        current_version: i64,
    },
    /// Storage backend error
    Storage(String),
    /// Internal error
    Internal(String),
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::StateConflict(_) => codes::STATE_CONFLICT,
            AppError::Ownership(_) => codes::OWNERSHIP_ERROR,
            AppError::InvalidCredentials(_) => codes::INVALID_CREDENTIALS,
            AppError::WrongPassword(_) => codes::WRONG_PASSWORD,
            AppError::RoleMismatch(_) => codes::ROLE_MISMATCH,
            AppError::Conflict { .. } => codes::VERSION_MISMATCH,
            AppError::Storage(_) => codes::STORAGE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::StateConflict(msg) => msg.clone(),
            AppError::Ownership(msg) => msg.clone(),
            AppError::InvalidCredentials(msg) => msg.clone(),
            AppError::WrongPassword(msg) => msg.clone(),
            AppError::RoleMismatch(msg) => msg.clone(),
            AppError::Conflict { message, .. } => message.clone(),
            AppError::Storage(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Storage(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        AppError::Storage(format!("I/O error: {}", err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        tracing::error!("CSV error: {:?}", err);
        AppError::Internal(format!("CSV error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
    pub revision_id: i64,
}

impl ErrorResponse {
    pub fn new(error: &AppError, revision_id: i64) -> Self {
        let details = match error {
            AppError::Conflict {
                current_version, ..
            } => Some(serde_json::json!({ "currentVersion": current_version })),
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details,
            },
            revision_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_carries_current_version() {
        let err = AppError::Conflict {
            message: "Version mismatch".to_string(),
            current_version: 7,
        };
        let body = ErrorResponse::new(&err, 7);

        assert!(!body.success);
        assert_eq!(body.error.code, codes::VERSION_MISMATCH);
        assert_eq!(body.error.details, Some(serde_json::json!({ "currentVersion": 7 })));
    }

    #[test]
    fn test_display_includes_code() {
        let err = AppError::Ownership("Ticket belongs to another user".to_string());
        assert_eq!(
            err.to_string(),
            "OWNERSHIP_ERROR: Ticket belongs to another user"
        );
    }
}
