//! User storage trait.
//!
//! Defines the interface for user persistence operations.
//! Implementations are provided by storage backends (e.g., PostgreSQL).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;

// =============================================================================
// User Types
// =============================================================================

/// A registered account.
///
/// The password hash is never serialized, so a `User` can be returned to
/// clients as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,

    /// Email address, unique across users. Stored normalized (trimmed,
    /// lowercase).
    pub email: String,

    /// PHC-formatted password hash.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// When the user was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the user was last updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Builds a new user record with a fresh id and current timestamps.
    #[must_use]
    pub fn new(new_user: &NewUser, password_hash: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            email: new_user.email.clone(),
            password_hash: password_hash.into(),
            name: new_user.name.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Name used when addressing the user: the display name if set,
    /// otherwise the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

/// Data needed to create a user, besides the password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Normalized email address.
    pub email: String,
    /// Optional display name.
    pub name: Option<String>,
}

// =============================================================================
// Storage Trait
// =============================================================================

/// Storage operations for users.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Persists a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyExists` if the email is taken. Backends
    /// must enforce this atomically; it is the authoritative uniqueness guard.
    async fn create(&self, user: &NewUser, password_hash: &str) -> AuthResult<User>;

    /// Find a user by their email address.
    ///
    /// Returns `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Find a user by their unique ID.
    ///
    /// Returns `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>>;

    /// Returns `true` if a user with this email exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn exists(&self, email: &str) -> AuthResult<bool>;
}
