// Sonara account API: JWT authentication and account management over HTTP

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod users;
pub mod validation;

use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use validator::Validate;

use auth::{
    middleware::{authenticate, require_authentication},
    AccessPolicy, AuthService, PasswordService, RequireRole, Role, TokenService,
};
use config::BootstrapAdmin;
use error::{ApiError, ErrorResponse};
use users::{
    models::{CreateUserRequest, UpdateStatusRequest, UpdateUserRequest, UserPage},
    AccountStatus, UserResponse, UserService, UserStore,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::login_handler,
        users::handlers::create_user,
        users::handlers::get_current_user,
        users::handlers::search_users,
        users::handlers::get_user,
        users::handlers::update_user,
        users::handlers::delete_user,
        users::handlers::change_user_status,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::LoginResponse,
            Role,
            AccountStatus,
            CreateUserRequest,
            UpdateUserRequest,
            UpdateStatusRequest,
            UserResponse,
            UserPage,
            ErrorResponse
        )
    ),
    tags(
        (name = "auth", description = "Login and session tokens"),
        (name = "users", description = "Account registration and management")
    ),
    info(
        title = "Sonara API",
        version = "1.0.0",
        description = "Account and authentication API for the Sonara music streaming service"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub tokens: Arc<TokenService>,
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    /// Wire the services over one account store
    pub fn new<S>(store: Arc<S>, passwords: PasswordService, tokens: TokenService) -> Self
    where
        S: UserStore + 'static,
    {
        let tokens = Arc::new(tokens);

        Self {
            auth: Arc::new(AuthService::new(
                store.clone(),
                passwords.clone(),
                tokens.clone(),
            )),
            users: Arc::new(UserService::new(store, passwords)),
            tokens,
            policy: Arc::new(AccessPolicy::standard()),
        }
    }
}

/// Creates and configures the application router.
///
/// Every request passes the token filter first, then access enforcement
/// against [`AccessPolicy::standard`]; admin-only routes add a role gate.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let admin_only = || {
        middleware::from_fn(|request: Request, next: Next| {
            RequireRole::admin().middleware(request, next)
        })
    };

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/auth/login", post(auth::login_handler))
        .route(
            "/api/users",
            post(users::create_user).merge(get(users::search_users).route_layer(admin_only())),
        )
        .route("/api/users/me", get(users::get_current_user))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/users/:id/status",
            put(users::change_user_status).route_layer(admin_only()),
        )
        .layer(middleware::from_fn_with_state(
            state.policy.clone(),
            require_authentication,
        ))
        .layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            authenticate,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Create the configured administrator account unless its email is taken
pub async fn bootstrap_admin(users: &UserService, admin: &BootstrapAdmin) -> Result<(), ApiError> {
    let request = CreateUserRequest {
        email: admin.email.clone(),
        password: admin.password.clone(),
        name: "Administrator".to_string(),
        country: None,
    };
    request.validate()?;

    if users.ensure_account(request, Role::Admin).await? {
        info!("Created bootstrap administrator {}", admin.email);
    }
    Ok(())
}
