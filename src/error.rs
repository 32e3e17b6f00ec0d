// Error handling module for the Sonara API
// Provides centralized error types and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::auth::AuthError;
use crate::users::repository::StoreError;

/// Main error type for the account endpoints.
///
/// Each variant maps to one HTTP status code and the shared
/// [`ErrorResponse`] body.
#[derive(Debug)]
pub enum ApiError {
    /// Validation errors from request validation
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// Request is well-formed but not allowed in the current state
    /// Maps to HTTP 400 Bad Request
    BadRequest { message: String },

    /// Resource not found by ID
    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// Duplicate resource conflict
    /// Maps to HTTP 409 Conflict
    Conflict { field: String, message: String },

    /// Database operation errors
    /// Maps to HTTP 500; details are only logged
    DatabaseError(sqlx::Error),

    /// Internal server errors
    /// Maps to HTTP 500; details are only logged
    InternalError(String),

    /// Authentication failures
    /// Maps to HTTP 401 Unauthorized
    Unauthorized(String),

    /// Authorization failures
    /// Maps to HTTP 403 Forbidden
    Forbidden(String),
}

/// Consistent error response structure
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "NOT_FOUND")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (e.g., field-level validation errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Convert ApiError to HTTP status code and ErrorResponse.
    ///
    /// 500-level errors are logged at error level with full detail while the
    /// client only receives a generic message.
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new(
                        "VALIDATION_ERROR",
                        "Request validation failed",
                        Some(serde_json::to_value(errors).unwrap_or(serde_json::json!({}))),
                    ),
                )
            }
            ApiError::BadRequest { message } => {
                debug!("Bad request: {}", message);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("BAD_REQUEST", message.clone(), None),
                )
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NOT_FOUND", format!("{} {} not found", resource, id), None),
                )
            }
            ApiError::Conflict { field, message } => {
                warn!("Conflict error on {}: {}", field, message);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new(
                        "CONFLICT",
                        "Resource conflict",
                        Some(serde_json::json!({ field.as_str(): message })),
                    ),
                )
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("DATABASE_ERROR", "A database error occurred", None),
                )
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred", None),
                )
            }
            ApiError::Unauthorized(message) => {
                warn!("Unauthorized access attempt: {}", message);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("UNAUTHORIZED", message.clone(), None),
                )
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden access attempt: {}", message);
                (
                    StatusCode::FORBIDDEN,
                    ErrorResponse::new("FORBIDDEN", message.clone(), None),
                )
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn user_not_found(id: i64) -> Self {
        ApiError::NotFound {
            resource: "User".to_string(),
            id: id.to_string(),
        }
    }
}

/// Convert sqlx errors to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Duplicate { field } => ApiError::Conflict {
                field: field.to_string(),
                message: format!("An account with this {} already exists", field),
            },
            StoreError::Database(e) => ApiError::DatabaseError(e),
            StoreError::CorruptRecord(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthorized => ApiError::Unauthorized("Authentication required".to_string()),
            AuthError::Forbidden { .. } => ApiError::Forbidden(error.to_string()),
            AuthError::Store(e) => ApiError::from(e),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let error = ApiError::from(StoreError::Duplicate { field: "email" });
        assert_eq!(error.status_code(), StatusCode::CONFLICT);

        let (_, body) = error.to_error_response();
        assert_eq!(body.error_code, "CONFLICT");
        assert!(body.details.unwrap()["email"].is_string());
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let (status, body) =
            ApiError::InternalError("secret connection string".to_string()).to_error_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("secret"));

        let (_, body) = ApiError::from(StoreError::CorruptRecord("user 1: bad".into()))
            .to_error_response();
        assert!(!body.message.contains("user 1"));
    }

    #[test]
    fn test_not_found_message() {
        let (status, body) = ApiError::user_not_found(7).to_error_response();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.message, "User 7 not found");
    }

    #[test]
    fn test_auth_errors_keep_their_status() {
        assert_eq!(ApiError::from(AuthError::Unauthorized).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(AuthError::PasswordHash("x".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
