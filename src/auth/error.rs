// Authentication and authorization error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::auth::models::Role;
use crate::users::repository::StoreError;

/// Reasons a bearer token failed validation.
///
/// These never reach the client as distinct responses: the authorization
/// filter treats all of them as "unauthenticated".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token has expired")]
    Expired,
}

/// Authentication and authorization error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Bad credentials, inactive account, or missing identity.
    /// Rendered as a bare 401 so nothing about the account leaks.
    #[error("Unauthorized")]
    Unauthorized,

    /// Caller is authenticated but its role is not in the allowed set
    #[error("Insufficient permissions: required one of {required:?}, but user has role '{actual}'")]
    Forbidden { required: Vec<Role>, actual: Role },

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Token generation error: {0}")]
    TokenGeneration(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthError::Unauthorized => return StatusCode::UNAUTHORIZED.into_response(),
            AuthError::Forbidden { required, actual } => {
                warn!(
                    "Authorization failed: required one of {:?}, user has role '{}'",
                    required, actual
                );
                let required = required
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                (
                    StatusCode::FORBIDDEN,
                    format!("Insufficient permissions: required role {}", required),
                )
            }
            AuthError::Store(e) => {
                error!("Credential store error in auth: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AuthError::PasswordHash(msg) => {
                error!("Password hashing error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AuthError::TokenGeneration(msg) => {
                error!("Token generation error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::PasswordHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenGeneration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
