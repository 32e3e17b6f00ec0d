// HTTP handlers for authentication endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use tracing::debug;

use crate::auth::{
    error::AuthError,
    models::{LoginRequest, LoginResponse},
};
use crate::AppState;

/// Log in with email and password
/// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted, session token issued", body = LoginResponse),
        (status = 401, description = "Bad credentials or inactive account (empty body)")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthError> {
    // An unreadable body is a failed login, not a client error
    let Json(request) = payload.map_err(|rejection| {
        debug!("Login rejected: unreadable body: {}", rejection);
        AuthError::Unauthorized
    })?;

    let response = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(response))
}
