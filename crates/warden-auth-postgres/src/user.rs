//! User storage.
//!
//! Stores user accounts in the `users` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use time::OffsetDateTime;
use uuid::Uuid;
use warden_auth::{AuthResult, NewUser, User, UserStorage};

use crate::{PgPool, StorageError, StorageResult};

const CREATE_USERS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        name          TEXT,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

// =============================================================================
// Types
// =============================================================================

type UserTuple = (
    Uuid,
    String,
    String,
    Option<String>,
    OffsetDateTime,
    OffsetDateTime,
);

fn user_from_tuple(row: UserTuple) -> User {
    User {
        id: row.0,
        email: row.1,
        password_hash: row.2,
        name: row.3,
        created_at: row.4,
        updated_at: row.5,
    }
}

// =============================================================================
// User Storage
// =============================================================================

/// PostgreSQL-backed [`UserStorage`].
#[derive(Debug, Clone)]
pub struct PostgresUserStorage {
    pool: Arc<PgPool>,
}

impl PostgresUserStorage {
    /// Create a new user storage over a shared pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `users` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the DDL statement fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        query(CREATE_USERS_TABLE).execute(self.pool()).await?;
        tracing::debug!("users table ready");
        Ok(())
    }

    async fn insert(&self, new_user: &NewUser, password_hash: &str) -> StorageResult<User> {
        let row: UserTuple = query_as(
            r#"
            INSERT INTO users (id, email, password_hash, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, email, password_hash, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_user.email)
        .bind(password_hash)
        .bind(new_user.name.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            if let sqlx_core::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StorageError::conflict(format!(
                    "User with email '{}' already exists",
                    new_user.email
                ));
            }
            StorageError::from(e)
        })?;

        Ok(user_from_tuple(row))
    }

    async fn select_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let row: Option<UserTuple> = query_as(
            r#"
            SELECT id, email, password_hash, name, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(user_from_tuple))
    }

    async fn select_by_id(&self, id: Uuid) -> StorageResult<Option<User>> {
        let row: Option<UserTuple> = query_as(
            r#"
            SELECT id, email, password_hash, name, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(user_from_tuple))
    }

    async fn email_taken(&self, email: &str) -> StorageResult<bool> {
        let (exists,): (bool,) =
            query_as("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(self.pool())
                .await?;

        Ok(exists)
    }
}

#[async_trait]
impl UserStorage for PostgresUserStorage {
    async fn create(&self, new_user: &NewUser, password_hash: &str) -> AuthResult<User> {
        self.insert(new_user, password_hash)
            .await
            .map_err(|e| e.into_auth_error("create user"))
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        self.select_by_email(email)
            .await
            .map_err(|e| e.into_auth_error("find user by email"))
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        self.select_by_id(id)
            .await
            .map_err(|e| e.into_auth_error("find user by id"))
    }

    async fn exists(&self, email: &str) -> AuthResult<bool> {
        self.email_taken(email)
            .await
            .map_err(|e| e.into_auth_error("check email"))
    }
}
