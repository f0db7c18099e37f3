//! # warden-auth
//!
//! Session credentials and account flows for the Warden service.
//!
//! This crate provides:
//! - HS256 session tokens with issue and validate
//! - A TTL cache of user records keyed by email
//! - Register, login and profile flows over a pluggable user store
//! - Axum handlers and a bearer-token extractor
//!
//! ## Modules
//!
//! - [`config`] - Token, cache and password settings
//! - [`token`] - Session token issuance and validation
//! - [`cache`] - In-process user cache with lazy expiry
//! - [`password`] - Argon2id password hashing
//! - [`storage`] - User records and the storage trait
//! - [`service`] - The account orchestrator
//! - [`middleware`] - Bearer authentication and error responses
//! - [`http`] - Axum handlers for the account endpoints

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod password;
pub mod service;
pub mod storage;
pub mod token;

pub use cache::{CacheStats, UserCache};
pub use config::{AuthConfig, CacheConfig, ConfigError, PasswordConfig, TokenConfig};
pub use error::{AuthError, ErrorCategory, TokenErrorKind};
pub use http::{AuthPayload, ProfilePayload, auth_routes};
pub use middleware::{AuthState, BearerAuth};
pub use password::{Argon2PasswordHasher, PasswordError, PasswordHasher};
pub use service::{
    AuthResponse, AuthService, AuthServiceBuilder, LoginRequest, RegisterRequest, normalize_email,
};
pub use storage::{InMemoryUserStorage, NewUser, User, UserStorage};
pub use token::{JwtError, SessionClaims, TokenService};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use warden_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory, TokenErrorKind};
    pub use crate::middleware::{AuthState, BearerAuth};
    pub use crate::service::{AuthService, LoginRequest, RegisterRequest};
    pub use crate::storage::{NewUser, User, UserStorage};
    pub use crate::token::{SessionClaims, TokenService};
}
