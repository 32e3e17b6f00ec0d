// Authentication service - business logic layer

use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::{
    error::AuthError,
    models::LoginResponse,
    password::PasswordService,
    token::{SessionClaims, TokenService},
};
use crate::users::{models::AccountStatus, repository::CredentialStore};

/// Authentication service: checks credentials and mints session tokens
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    password_service: PasswordService,
    token_service: Arc<TokenService>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        store: Arc<dyn CredentialStore>,
        password_service: PasswordService,
        token_service: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            password_service,
            token_service,
        }
    }

    /// Log in with an email and password.
    ///
    /// Unknown email, wrong password and non-active account all return
    /// `AuthError::Unauthorized`. The unknown-email path still performs one
    /// Argon2 computation so it costs as much as a real verification.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AuthError> {
        let Some(user) = self.store.find_by_identifier(email).await? else {
            self.password_service.equalize_timing_async(password).await;
            debug!("Login rejected: unknown account");
            return Err(AuthError::Unauthorized);
        };

        if !self
            .password_service
            .verify_password_async(password, &user.password_hash)
            .await
        {
            debug!("Login rejected: bad password for account id={}", user.id);
            return Err(AuthError::Unauthorized);
        }

        if user.status != AccountStatus::Active {
            info!(
                "Login rejected: account id={} has status {}",
                user.id, user.status
            );
            return Err(AuthError::Unauthorized);
        }

        let token = self.token_service.mint(
            &user.email,
            SessionClaims {
                user_id: user.id,
                role: user.role,
            },
        )?;

        info!("Login succeeded for account id={}", user.id);
        Ok(LoginResponse {
            token,
            role: user.role,
        })
    }
}
