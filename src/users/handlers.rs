// HTTP handlers for account endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, warn};
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::error::{ApiError, ErrorResponse};
use crate::users::models::{
    CreateUserRequest, UpdateStatusRequest, UpdateUserRequest, UserPage, UserResponse,
    UserSearchParams,
};
use crate::AppState;

/// Reject callers that are neither the account owner nor an administrator
fn ensure_self_or_admin(user: &AuthenticatedUser, id: i64) -> Result<(), ApiError> {
    if user.can_access_account(id) {
        return Ok(());
    }

    warn!(
        "User {} ({}) denied access to account {}",
        user.user_id, user.role, id
    );
    Err(ApiError::Forbidden(
        "You may only access your own account".to_string(),
    ))
}

/// Handler for POST /api/users
/// Registers a new account with the default role
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid input data", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.validate()?;

    let user = state.users.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Handler for GET /api/users/me
/// Returns the account of the authenticated caller
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "users"
)]
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserResponse>, ApiError> {
    debug!("Fetching current account {}", user.user_id);

    let account = state.users.get(user.user_id).await?;
    Ok(Json(account.into()))
}

/// Handler for GET /api/users
/// Paged search over name and email (admin only)
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserSearchParams),
    responses(
        (status = 200, description = "Matching accounts", body = UserPage),
        (status = 400, description = "Invalid paging parameters", body = ErrorResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an administrator")
    ),
    tag = "users"
)]
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<UserSearchParams>,
) -> Result<Json<UserPage>, ApiError> {
    params.validate()?;

    let page = state.users.search(&params).await?;
    Ok(Json(page))
}

/// Handler for GET /api/users/:id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = i64, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Account found", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the owner and not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_self_or_admin(&user, id)?;

    let account = state.users.get(id).await?;
    Ok(Json(account.into()))
}

/// Handler for PUT /api/users/:id
/// Updates email, name and country; omitted or blank fields keep their value
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = i64, Path, description = "Account ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, description = "Invalid input data", body = ErrorResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the owner and not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    ensure_self_or_admin(&user, id)?;
    let payload = payload.normalized();
    payload.validate()?;

    let account = state.users.update(id, payload).await?;
    Ok(Json(account.into()))
}

/// Handler for DELETE /api/users/:id
/// Soft delete: the account is kept with status DELETED and can no longer log in
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = i64, Path, description = "Account ID")
    ),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the owner and not an administrator", body = ErrorResponse),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    ensure_self_or_admin(&user, id)?;

    state.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for PUT /api/users/:id/status
/// Moves an account to a new status (admin only)
#[utoipa::path(
    put,
    path = "/api/users/{id}/status",
    params(
        ("id" = i64, Path, description = "Account ID")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = UserResponse),
        (status = 400, description = "Transition not allowed", body = ErrorResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Account not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn change_user_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    debug!(
        "Admin {} changing status of account {} to {}",
        user.user_id, id, payload.status
    );

    let account = state.users.change_status(id, payload.status).await?;
    Ok(Json(account.into()))
}
