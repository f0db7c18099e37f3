//! PostgreSQL storage backend for Warden Auth
//!
//! Provides persistent storage for user accounts in a single `users` table.
//! Email uniqueness is enforced by a unique index, so concurrent registrations
//! for the same address resolve to exactly one row.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden_auth_postgres::{PostgresUserStorage, connect};
//!
//! let pool = connect("postgres://localhost/warden", 10).await?;
//! let storage = PostgresUserStorage::new(Arc::new(pool));
//! storage.ensure_schema().await?;
//! ```

pub mod user;

use std::time::Duration;

use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::Postgres;
use warden_auth::AuthError;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use user::PostgresUserStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during user storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// A row with the same unique key already exists.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a database error.
    #[must_use]
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    /// Converts into the auth error seen by callers, tagging database
    /// failures with the operation that hit them.
    pub fn into_auth_error(self, operation: &str) -> AuthError {
        match self {
            Self::Conflict(_) => AuthError::AlreadyExists,
            Self::Database(e) => AuthError::upstream(operation, e),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Connection
// =============================================================================

/// Opens a connection pool.
///
/// # Errors
///
/// Returns an error if the first connection cannot be established.
pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<PgPool> {
    let pool = PoolOptions::<Postgres>::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "Connected to PostgreSQL");

    Ok(pool)
}

// =============================================================================
// Tests
// =============================================================================
