// Credential store: account persistence behind the authentication core

use async_trait::async_trait;
use sqlx::PgPool;

use crate::auth::models::Role;
use crate::users::models::{AccountStatus, NewUser, ProfileUpdate, User, UserRow};

const USER_COLUMNS: &str = "id, email, password_hash, name, country, status, role, created_at";

/// Errors raised at the store boundary
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique column (the case-insensitive email) already holds this value
    #[error("duplicate value for {field}")]
    Duplicate { field: &'static str },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped back to a record
    #[error("corrupt record: {0}")]
    CorruptRecord(String),
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<AccountStatus>()
            .map_err(|e| StoreError::CorruptRecord(format!("user {}: {}", row.id, e)))?;
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::CorruptRecord(format!("user {}: {}", row.id, e)))?;

        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            country: row.country,
            status,
            role,
            created_at: row.created_at,
        })
    }
}

/// Lookup capability the authentication core depends on.
/// Identifiers (emails) compare case-insensitively.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError>;

    async fn exists_by_identifier(&self, identifier: &str) -> Result<bool, StoreError>;
}

/// Full account persistence used by the account service
#[async_trait]
pub trait UserStore: CredentialStore {
    /// Insert a new account; `Duplicate` if the email is taken
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Apply a partial profile change; `None` if the account does not exist
    async fn update_profile(&self, id: i64, update: ProfileUpdate)
        -> Result<Option<User>, StoreError>;

    /// Soft status transition; `None` if the account does not exist
    async fn set_status(&self, id: i64, status: AccountStatus) -> Result<Option<User>, StoreError>;

    /// Page of accounts whose name or email contains `pattern`, plus the total match count
    async fn search(&self, pattern: &str, page: u32, size: u32)
        -> Result<(Vec<User>, i64), StoreError>;
}

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_write_error(e: sqlx::Error) -> StoreError {
    // Check for unique constraint violation
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StoreError::Duplicate { field: "email" };
        }
    }
    StoreError::Database(e)
}

/// Escape LIKE wildcards so the pattern is matched literally
fn like_pattern(pattern: &str) -> String {
    let escaped = pattern
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl CredentialStore for PgUserRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn exists_by_identifier(&self, identifier: &str) -> Result<bool, StoreError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(identifier)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists.0)
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (email, password_hash, name, country, status, role) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.country)
        .bind(AccountStatus::Active.as_str())
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        User::try_from(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET email = COALESCE($1, email), name = COALESCE($2, name), \
             country = COALESCE($3, country) WHERE id = $4 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(update.email)
        .bind(update.name)
        .bind(update.country)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        row.map(User::try_from).transpose()
    }

    async fn set_status(&self, id: i64, status: AccountStatus) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET status = $1 WHERE id = $2 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn search(
        &self,
        pattern: &str,
        page: u32,
        size: u32,
    ) -> Result<(Vec<User>, i64), StoreError> {
        let pattern = like_pattern(pattern);

        let total: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE LOWER(name) LIKE $1 OR LOWER(email) LIKE $1",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE LOWER(name) LIKE $1 OR LOWER(email) LIKE $1 \
             ORDER BY id LIMIT $2 OFFSET $3",
            USER_COLUMNS
        ))
        .bind(&pattern)
        .bind(i64::from(size))
        .bind(i64::from(page) * i64::from(size))
        .fetch_all(&self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((users, total.0))
    }
}

/// In-memory store used by the test suite in place of PostgreSQL
#[cfg(test)]
pub mod memory {
    use super::*;
    use chrono::Utc;
    use tokio::sync::RwLock;

    #[derive(Default)]
    pub struct InMemoryUserStore {
        users: RwLock<Vec<User>>,
    }

    impl InMemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    fn same_identifier(a: &str, b: &str) -> bool {
        a.to_lowercase() == b.to_lowercase()
    }

    #[async_trait]
    impl CredentialStore for InMemoryUserStore {
        async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
            let users = self.users.read().await;
            Ok(users
                .iter()
                .find(|u| same_identifier(&u.email, identifier))
                .cloned())
        }

        async fn exists_by_identifier(&self, identifier: &str) -> Result<bool, StoreError> {
            let users = self.users.read().await;
            Ok(users.iter().any(|u| same_identifier(&u.email, identifier)))
        }
    }

    #[async_trait]
    impl UserStore for InMemoryUserStore {
        async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
            let mut users = self.users.write().await;
            if users.iter().any(|u| same_identifier(&u.email, &user.email)) {
                return Err(StoreError::Duplicate { field: "email" });
            }

            let record = User {
                id: users.len() as i64 + 1,
                email: user.email,
                password_hash: user.password_hash,
                name: user.name,
                country: user.country,
                status: AccountStatus::Active,
                role: user.role,
                created_at: Utc::now(),
            };
            users.push(record.clone());
            Ok(record)
        }

        async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
            let users = self.users.read().await;
            Ok(users.iter().find(|u| u.id == id).cloned())
        }

        async fn update_profile(
            &self,
            id: i64,
            update: ProfileUpdate,
        ) -> Result<Option<User>, StoreError> {
            let mut users = self.users.write().await;
            if let Some(email) = &update.email {
                if users
                    .iter()
                    .any(|u| u.id != id && same_identifier(&u.email, email))
                {
                    return Err(StoreError::Duplicate { field: "email" });
                }
            }

            let Some(user) = users.iter_mut().find(|u| u.id == id) else {
                return Ok(None);
            };
            if let Some(email) = update.email {
                user.email = email;
            }
            if let Some(name) = update.name {
                user.name = name;
            }
            if let Some(country) = update.country {
                user.country = Some(country);
            }
            Ok(Some(user.clone()))
        }

        async fn set_status(
            &self,
            id: i64,
            status: AccountStatus,
        ) -> Result<Option<User>, StoreError> {
            let mut users = self.users.write().await;
            Ok(users.iter_mut().find(|u| u.id == id).map(|user| {
                user.status = status;
                user.clone()
            }))
        }

        async fn search(
            &self,
            pattern: &str,
            page: u32,
            size: u32,
        ) -> Result<(Vec<User>, i64), StoreError> {
            let needle = pattern.to_lowercase();
            let users = self.users.read().await;
            let matches: Vec<User> = users
                .iter()
                .filter(|u| {
                    u.name.to_lowercase().contains(&needle)
                        || u.email.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect();

            let total = matches.len() as i64;
            let items = matches
                .into_iter()
                .skip(page as usize * size as usize)
                .take(size as usize)
                .collect();
            Ok((items, total))
        }
    }
}
