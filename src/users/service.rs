// Account service - business logic layer

use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::models::Role;
use crate::auth::password::PasswordService;
use crate::error::ApiError;
use crate::users::{
    models::{
        AccountStatus, CreateUserRequest, NewUser, UpdateUserRequest, User, UserPage,
        UserResponse, UserSearchParams,
    },
    repository::UserStore,
};

/// Account service coordinating registration and profile operations
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
    passwords: PasswordService,
}

impl UserService {
    /// Create a new UserService
    pub fn new(store: Arc<dyn UserStore>, passwords: PasswordService) -> Self {
        Self { store, passwords }
    }

    /// Register a new account with the default role.
    ///
    /// The email must not be taken (case-insensitive); the password is
    /// hashed before it reaches the store.
    pub async fn register(&self, request: CreateUserRequest) -> Result<User, ApiError> {
        self.create_account(request, Role::User).await
    }

    /// Create an account with an explicit role
    pub async fn create_account(
        &self,
        request: CreateUserRequest,
        role: Role,
    ) -> Result<User, ApiError> {
        if self.store.exists_by_identifier(&request.email).await? {
            return Err(ApiError::Conflict {
                field: "email".to_string(),
                message: "An account with this email already exists".to_string(),
            });
        }

        let password_hash = self.passwords.hash_password_async(&request.password).await?;

        let user = self
            .store
            .insert(NewUser {
                email: request.email,
                password_hash,
                name: request.name.trim().to_string(),
                country: request.country,
                role,
            })
            .await?;

        info!("Registered account id={} role={}", user.id, user.role);
        Ok(user)
    }

    /// Create the account unless its email is already registered.
    /// Returns `true` when a new account was created.
    pub async fn ensure_account(
        &self,
        request: CreateUserRequest,
        role: Role,
    ) -> Result<bool, ApiError> {
        if self.store.exists_by_identifier(&request.email).await? {
            debug!("Account {} already present", request.email);
            return Ok(false);
        }
        self.create_account(request, role).await?;
        Ok(true)
    }

    /// Get an account by id
    pub async fn get(&self, id: i64) -> Result<User, ApiError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::user_not_found(id))
    }

    /// Apply a profile update; blank email/name are ignored
    pub async fn update(&self, id: i64, request: UpdateUserRequest) -> Result<User, ApiError> {
        let update = request.normalized();

        if let Some(email) = &update.email {
            if let Some(existing) = self.store.find_by_identifier(email).await? {
                if existing.id != id {
                    return Err(ApiError::Conflict {
                        field: "email".to_string(),
                        message: "An account with this email already exists".to_string(),
                    });
                }
            }
        }

        let user = self
            .store
            .update_profile(id, update.into())
            .await?
            .ok_or_else(|| ApiError::user_not_found(id))?;

        info!("Updated profile of account id={}", id);
        Ok(user)
    }

    /// Move an account to a new status. `Deleted` is terminal.
    pub async fn change_status(&self, id: i64, status: AccountStatus) -> Result<User, ApiError> {
        let current = self.get(id).await?;

        if !current.status.can_transition_to(status) {
            return Err(ApiError::BadRequest {
                message: format!(
                    "Cannot change account status from {} to {}",
                    current.status, status
                ),
            });
        }

        let user = self
            .store
            .set_status(id, status)
            .await?
            .ok_or_else(|| ApiError::user_not_found(id))?;

        info!(
            "Account id={} status changed {} -> {}",
            id, current.status, user.status
        );
        Ok(user)
    }

    /// Soft delete: the record stays, its status becomes `Deleted`
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.change_status(id, AccountStatus::Deleted).await?;
        Ok(())
    }

    /// Case-insensitive substring search over name and email
    pub async fn search(&self, params: &UserSearchParams) -> Result<UserPage, ApiError> {
        let (page, size) = (params.page(), params.size());
        let (users, total) = self.store.search(&params.pattern(), page, size).await?;

        debug!("User search matched {} accounts", total);
        Ok(UserPage {
            items: users.into_iter().map(UserResponse::from).collect(),
            page,
            size,
            total,
        })
    }
}
