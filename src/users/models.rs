// Account data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::models::Role;

/// Lifecycle state of an account. Only `Active` accounts may log in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
    Deleted,
    Banned,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 5] = [
        AccountStatus::Active,
        AccountStatus::Inactive,
        AccountStatus::Suspended,
        AccountStatus::Deleted,
        AccountStatus::Banned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Inactive => "INACTIVE",
            AccountStatus::Suspended => "SUSPENDED",
            AccountStatus::Deleted => "DELETED",
            AccountStatus::Banned => "BANNED",
        }
    }

    /// `Deleted` is terminal; every other status may move anywhere
    pub fn can_transition_to(self, next: AccountStatus) -> bool {
        self != AccountStatus::Deleted || next == AccountStatus::Deleted
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown account status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AccountStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Credential record: one account as held by the store
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub country: Option<String>,
    pub status: AccountStatus,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Raw `users` row; role and status are stored as text
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub country: Option<String>,
    pub status: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert an account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub country: Option<String>,
    pub role: Role,
}

/// Partial profile change; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub country: Option<String>,
}

/// Registration request DTO
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email)]
    #[schema(example = "boss@sonara.com")]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    #[schema(example = "correct_password")]
    pub password: String,
    #[validate(
        length(min = 1, max = 255),
        custom = "crate::validation::validate_not_blank"
    )]
    #[schema(example = "Boss")]
    pub name: String,
    #[validate(length(max = 255))]
    #[schema(example = "Ukraine")]
    pub country: Option<String>,
}

/// Profile update DTO; blank email or name are ignored
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub country: Option<String>,
}

impl UpdateUserRequest {
    /// Drop blank email/name so they leave the stored values untouched
    pub fn normalized(self) -> Self {
        let keep = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            email: keep(self.email),
            name: keep(self.name),
            country: self.country,
        }
    }
}

impl From<UpdateUserRequest> for ProfileUpdate {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            email: request.email,
            name: request.name,
            country: request.country,
        }
    }
}

/// Status change DTO (admin only)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: AccountStatus,
}

/// Search query for `GET /api/users`
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserSearchParams {
    /// Substring matched against name or email, case-insensitive
    pub q: Option<String>,
    /// Zero-based page index
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub size: Option<u32>,
}

impl UserSearchParams {
    pub const DEFAULT_SIZE: u32 = 20;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(0)
    }

    pub fn size(&self) -> u32 {
        self.size.unwrap_or(Self::DEFAULT_SIZE)
    }

    pub fn pattern(&self) -> String {
        self.q.as_deref().unwrap_or("").trim().to_string()
    }
}

/// User response model (excludes password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "boss@sonara.com")]
    pub email: String,
    #[schema(example = "Boss")]
    pub name: String,
    pub country: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            country: user.country,
            status: user.status,
            created_at: user.created_at,
            role: user.role,
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPage {
    pub items: Vec<UserResponse>,
    pub page: u32,
    pub size: u32,
    pub total: i64,
}
