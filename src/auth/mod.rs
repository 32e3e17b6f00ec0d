// Authentication module
// Provides JWT session tokens, Argon2 password hashing, login and the request authorization filter

pub mod access;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use access::AccessPolicy;
pub use error::{AuthError, TokenError};
pub use handlers::login_handler;
pub use middleware::{AuthenticatedUser, RequireRole};
pub use models::{AuthContext, LoginRequest, LoginResponse, Role};
pub use password::PasswordService;
pub use service::AuthService;
pub use token::{Claims, SessionClaims, TokenService, ValidationOutcome};
