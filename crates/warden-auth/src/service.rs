//! Account flows: register, login and profile lookup.
//!
//! [`AuthService`] ties the collaborators together:
//!
//! - user records come from a [`UserStorage`], with login lookups going
//!   through the [`UserCache`] first
//! - passwords are hashed and checked by a [`PasswordHasher`] on the blocking
//!   pool
//! - tokens are issued and validated by the [`TokenService`]
//! - welcome notifications are handed to the [`NotificationDispatcher`] and
//!   never awaited by the request
//!
//! Registration checks for an existing email before inserting, but that check
//! is only a shortcut. Two concurrent registrations can both pass it, and the
//! storage backend's uniqueness guarantee decides which one wins.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};
use uuid::Uuid;
use warden_notifications::{LogNotifier, NotificationDispatcher, Notifier};

use crate::AuthResult;
use crate::cache::UserCache;
use crate::config::{AuthConfig, PasswordConfig};
use crate::error::AuthError;
use crate::password::{Argon2PasswordHasher, PasswordHasher};
use crate::storage::{NewUser, User, UserStorage};
use crate::token::{SessionClaims, TokenService};

/// Longest accepted email address.
const MAX_EMAIL_LENGTH: usize = 254;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Login input.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A user together with a freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

// =============================================================================
// Auth Service
// =============================================================================

/// Orchestrates account registration, login and profile lookup.
pub struct AuthService {
    storage: Arc<dyn UserStorage>,
    tokens: Arc<TokenService>,
    cache: Arc<UserCache>,
    hasher: Arc<dyn PasswordHasher>,
    dispatcher: NotificationDispatcher,
    notifier: Arc<dyn Notifier>,
    password_policy: PasswordConfig,
    /// Hash verified against when the email is unknown, so a failed login
    /// costs the same whether or not the account exists.
    decoy_hash: String,
}

impl AuthService {
    /// Starts building a service on top of `storage`.
    pub fn builder(storage: Arc<dyn UserStorage>) -> AuthServiceBuilder {
        AuthServiceBuilder::new(storage)
    }

    // -------------------------------------------------------------------------
    // Register
    // -------------------------------------------------------------------------

    /// Creates an account and returns it with a session token.
    ///
    /// The welcome notification is queued on the dispatcher and this call
    /// does not wait for it.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the email or password is unacceptable
    /// - `AlreadyExists` if the email is taken
    /// - `Upstream` if storage or hashing fails
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<AuthResponse> {
        let email = normalize_email(&request.email)?;
        self.check_password_policy(&request.password)?;
        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        if self.storage.exists(&email).await? {
            debug!(email = %email, "Registration rejected, email taken");
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = self.hash_password(request.password).await?;

        let user = self
            .storage
            .create(&NewUser { email, name }, &password_hash)
            .await?;

        // A login racing this registration may have cached a stale record
        self.cache.delete(&user.email);

        let token = self.tokens.issue(user.id, &user.email)?;

        self.queue_welcome(&user);

        info!(user_id = %user.id, email = %user.email, "User registered");

        Ok(AuthResponse { user, token })
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    /// Checks credentials and returns the user with a new session token.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the email or password is missing
    /// - `InvalidCredentials` if the email is unknown or the password is wrong
    /// - `Upstream` if storage or hashing fails
    pub async fn login(&self, request: LoginRequest) -> AuthResult<AuthResponse> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AuthError::invalid_request("email and password are required"));
        }
        let email = request.email.trim().to_lowercase();

        let Some(user) = self.find_user_by_email(&email).await? else {
            // Burn the same hashing time as a real check
            let _ = self
                .verify_password(request.password, self.decoy_hash.clone())
                .await;
            debug!(email = %email, "Login failed, unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .verify_password(request.password, user.password_hash.clone())
            .await?
        {
            debug!(user_id = %user.id, "Login failed, wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id, &user.email)?;

        info!(user_id = %user.id, "User logged in");

        Ok(AuthResponse { user, token })
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Fetches a user by id straight from storage. The cache is keyed by
    /// email and is not consulted.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no such user, `Upstream` if storage fails.
    pub async fn get_profile(&self, user_id: Uuid) -> AuthResult<User> {
        self.storage
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::not_found(format!("user {user_id}")))
    }

    /// Read-through lookup by normalized email.
    ///
    /// On a cache miss the record is loaded from storage and cached. Absent
    /// users are not cached. The cache lock is never held while storage is
    /// queried.
    pub async fn find_user_by_email(&self, email: &str) -> AuthResult<Option<User>> {
        if let Some(user) = self.cache.get(email) {
            return Ok(Some(user));
        }

        let user = self.storage.find_by_email(email).await?;
        if let Some(user) = &user {
            self.cache.set(email, user.clone());
        }

        Ok(user)
    }

    /// Validates a bearer token and returns its claims.
    ///
    /// # Errors
    ///
    /// `TokenInvalid` with the rejection reason.
    pub fn authenticate(&self, token: &str) -> AuthResult<SessionClaims> {
        self.tokens.validate(token).map_err(AuthError::from)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    pub fn cache(&self) -> &Arc<UserCache> {
        &self.cache
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn check_password_policy(&self, password: &str) -> AuthResult<()> {
        let length = password.chars().count();
        if length < self.password_policy.min_length {
            return Err(AuthError::invalid_request(format!(
                "password must be at least {} characters",
                self.password_policy.min_length
            )));
        }
        if length > self.password_policy.max_length {
            return Err(AuthError::invalid_request(format!(
                "password must be at most {} characters",
                self.password_policy.max_length
            )));
        }
        Ok(())
    }

    async fn hash_password(&self, password: String) -> AuthResult<String> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::internal(format!("password hashing task failed: {e}")))?
            .map_err(|e| AuthError::upstream("hash password", e))
    }

    async fn verify_password(&self, password: String, hash: String) -> AuthResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::internal(format!("password check task failed: {e}")))?
            .map_err(|e| AuthError::upstream("verify password", e))
    }

    fn queue_welcome(&self, user: &User) {
        let notifier = Arc::clone(&self.notifier);
        let address = user.email.clone();
        let display_name = user.display_name().to_string();

        let span = info_span!("welcome_notification", recipient = %address);
        span.in_scope(|| {
            self.dispatcher
                .submit(async move { notifier.send_welcome(&address, &display_name).await });
        });

        debug!(user_id = %user.id, "Welcome notification queued");
    }
}

/// Trims and lowercases an email and checks its basic shape.
pub fn normalize_email(raw: &str) -> AuthResult<String> {
    let email = raw.trim().to_lowercase();

    if email.is_empty() {
        return Err(AuthError::invalid_request("email is required"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(AuthError::invalid_request("email is too long"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AuthError::invalid_request("email address is invalid"));
    }

    Ok(email)
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`AuthService`].
///
/// Anything not set explicitly is derived from the [`AuthConfig`] (or its
/// defaults): an Argon2id hasher, a cache with the configured TTL, a
/// dispatcher with five slots and a notifier that only logs.
pub struct AuthServiceBuilder {
    storage: Arc<dyn UserStorage>,
    config: AuthConfig,
    tokens: Option<Arc<TokenService>>,
    cache: Option<Arc<UserCache>>,
    hasher: Option<Arc<dyn PasswordHasher>>,
    dispatcher: Option<NotificationDispatcher>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl AuthServiceBuilder {
    fn new(storage: Arc<dyn UserStorage>) -> Self {
        Self {
            storage,
            config: AuthConfig::default(),
            tokens: None,
            cache: None,
            hasher: None,
            dispatcher: None,
            notifier: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_tokens(mut self, tokens: Arc<TokenService>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<UserCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Validates the configuration and assembles the service.
    ///
    /// # Errors
    ///
    /// `Configuration` if the config is invalid or a component cannot be
    /// built from it.
    pub fn build(self) -> AuthResult<AuthService> {
        self.config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let tokens = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(
                TokenService::from_config(&self.config)
                    .map_err(|e| AuthError::configuration(e.to_string()))?,
            ),
        };

        let hasher: Arc<dyn PasswordHasher> = match self.hasher {
            Some(hasher) => hasher,
            None => Arc::new(
                Argon2PasswordHasher::from_config(&self.config.password)
                    .map_err(|e| AuthError::configuration(e.to_string()))?,
            ),
        };

        let decoy_hash = hasher
            .hash("decoy-password")
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        Ok(AuthService {
            storage: self.storage,
            tokens,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(UserCache::new(self.config.cache.ttl))),
            hasher,
            dispatcher: self
                .dispatcher
                .unwrap_or_else(|| NotificationDispatcher::new(5)),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(LogNotifier)),
            password_policy: self.config.password,
            decoy_hash,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
