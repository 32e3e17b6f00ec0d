// Account module: registration, profile management, admin search and status changes

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;

pub use handlers::*;
pub use models::{AccountStatus, User, UserResponse};
pub use repository::{CredentialStore, PgUserRepository, StoreError, UserStore};
pub use service::UserService;
