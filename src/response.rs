//! Uniform result envelope for every operation.

use serde::Serialize;
use serde_json::Value;

use crate::errors::{AppError, ErrorResponse};

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

/// Turn an operation result into its JSON envelope.
pub fn envelope<T: Serialize>(result: Result<T, AppError>, revision_id: i64) -> Value {
    let encoded = match result {
        Ok(data) => serde_json::to_value(ApiResponse::new(data, revision_id)),
        Err(err) => serde_json::to_value(ErrorResponse::new(&err, revision_id)),
    };
    encoded.unwrap_or_else(|e| {
        let err = AppError::Internal(format!("Response encoding failed: {}", e));
        serde_json::json!({
            "success": false,
            "error": { "code": err.error_code(), "message": err.message() },
            "revisionId": revision_id,
        })
    })
}
