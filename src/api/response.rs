//! Response types for the leave API.
//!
//! This module defines the error response structures and error handling
//! for the HTTP API.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::lifecycle::BulkApproveResult;

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }

    /// Creates an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            Json(self.error),
        )
            .into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let code = error.code();
        let message = error.to_string();
        let (status, details) = match &error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Some("The engine configuration could not be loaded".to_string()),
            ),
            EngineError::InvalidDateRange { .. } => (StatusCode::BAD_REQUEST, None),
            EngineError::InsufficientBalance { available, .. } => (
                StatusCode::BAD_REQUEST,
                Some(format!("{} days available", available)),
            ),
            EngineError::InvalidAmount { .. } => (
                StatusCode::BAD_REQUEST,
                Some("Amounts must be non-zero multiples of 0.5 days".to_string()),
            ),
            EngineError::InvalidEmployee { field, .. } => (
                StatusCode::BAD_REQUEST,
                Some(format!("The employee record is missing or has an invalid '{}'", field)),
            ),
            EngineError::AlreadyDecided { status, .. } => (
                StatusCode::CONFLICT,
                Some(format!("The request is already {}", status)),
            ),
            EngineError::GrantAlreadyMaterialized { .. } => (StatusCode::CONFLICT, None),
            EngineError::EmployeeNotFound { .. } | EngineError::RequestNotFound { .. } => {
                (StatusCode::NOT_FOUND, None)
            }
            EngineError::StoreUnavailable { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Some("The operation may be retried".to_string()),
            ),
        };

        ApiErrorResponse {
            status,
            error: ApiError {
                code: code.to_string(),
                message,
                details,
            },
        }
    }
}

/// Body returned by `POST /requests/bulk-approve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkApproveResponse {
    /// One result per requested id, in request order.
    pub results: Vec<BulkApproveResult>,
    /// Number approved.
    pub approved: usize,
    /// Number that failed.
    pub failed: usize,
}

impl From<Vec<BulkApproveResult>> for BulkApproveResponse {
    fn from(results: Vec<BulkApproveResult>) -> Self {
        let approved = results.iter().filter(|r| r.is_success()).count();
        Self {
            failed: results.len() - approved,
            approved,
            results,
        }
    }
}
