//! Error handling for the apparel operations backend
//!
//! Every failure is either caller-correctable (validation) or a persistence
//! failure; composite operations are atomic so nothing is half-applied.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use shared::WorkflowError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Insufficient stock for size {size}: requested {requested}, available {available}")]
    InsufficientStock {
        size: String,
        requested: i64,
        available: i64,
    },

    #[error("Operation already applied: {0}")]
    DuplicateOperation(String),

    // Persistence errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    StorageError(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field validation failure
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Serialization failure or deadlock reported by the database.
    /// The transaction was rolled back and the request can be retried as is.
    pub fn is_transaction_conflict(&self) -> bool {
        match self {
            AppError::DatabaseError(err) => err
                .as_database_error()
                .and_then(|db| db.code())
                .is_some_and(|code| code == "40001" || code == "40P01"),
            _ => false,
        }
    }

    /// True for errors the caller can correct and resubmit
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::NotFound(_)
                | AppError::InvalidStateTransition(_)
                | AppError::InsufficientStock { .. }
                | AppError::DuplicateOperation(_)
        )
    }
}

impl From<WorkflowError> for AppError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::UnknownSize(_)
            | WorkflowError::NegativeQuantity(_)
            | WorkflowError::QuantityOverflow(_) => {
                AppError::validation("realized", err.to_string())
            }
            WorkflowError::AlreadyCompleted | WorkflowError::AtFirstStage => {
                AppError::InvalidStateTransition(err.to_string())
            }
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                },
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INVALID_STATE_TRANSITION".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::InsufficientStock { size, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message: self.to_string(),
                    field: Some(size.clone()),
                },
            ),
            AppError::DuplicateOperation(key) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_OPERATION".to_string(),
                    message: format!("Operation {} has already been applied", key),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) if self.is_transaction_conflict() => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "TRANSACTION_CONFLICT".to_string(),
                    message: "Concurrent update conflict, retry the request".to_string(),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                },
            ),
            AppError::StorageError(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "STORAGE_ERROR".to_string(),
                    message: format!("Storage error: {}", msg),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: msg.clone(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
