//! In-memory user storage.
//!
//! Used by tests and by the `memory` storage backend of the server. Email
//! uniqueness is enforced under the write lock, like a unique index would.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::user::{NewUser, User, UserStorage};
use crate::AuthResult;
use crate::error::AuthError;

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    by_email: HashMap<String, Uuid>,
}

/// User storage backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryUserStorage {
    tables: RwLock<Tables>,
}

impl InMemoryUserStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.tables.read().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn create(&self, new_user: &NewUser, password_hash: &str) -> AuthResult<User> {
        let mut tables = self.tables.write();

        if tables.by_email.contains_key(&new_user.email) {
            return Err(AuthError::AlreadyExists);
        }

        let user = User::new(new_user, password_hash);
        tables.by_email.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        let tables = self.tables.read();
        Ok(tables
            .by_email
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AuthResult<Option<User>> {
        Ok(self.tables.read().users.get(&id).cloned())
    }

    async fn exists(&self, email: &str) -> AuthResult<bool> {
        Ok(self.tables.read().by_email.contains_key(email))
    }
}
