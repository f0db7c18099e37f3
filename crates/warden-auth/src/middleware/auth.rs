//! Bearer token authentication extractor.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use warden_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected_handler(BearerAuth(claims): BearerAuth) -> String {
//!     format!("Hello, {}!", claims.email)
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::service::AuthService;
use crate::token::SessionClaims;

// =============================================================================
// Auth State
// =============================================================================

/// State required by the auth handlers and the `BearerAuth` extractor.
///
/// Include it in your application state and expose it via `FromRef`:
///
/// ```ignore
/// #[derive(Clone)]
/// struct AppState {
///     auth: AuthState,
/// }
///
/// impl FromRef<AppState> for AuthState {
///     fn from_ref(state: &AppState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthState {
    /// The account service.
    pub service: Arc<AuthService>,
}

impl AuthState {
    #[must_use]
    pub fn new(service: Arc<AuthService>) -> Self {
        Self { service }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Extractor that requires a valid `Authorization: Bearer <token>` header.
///
/// Rejects with `Unauthorized` when the header is missing or not a bearer
/// credential, and with `TokenInvalid` when the token fails validation.
#[derive(Debug, Clone)]
pub struct BearerAuth(pub SessionClaims);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| AuthError::unauthorized("Missing Authorization header"))?
            .to_str()
            .map_err(|_| AuthError::unauthorized("Invalid Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AuthError::unauthorized("Authorization header must use Bearer scheme"))?;

        if token.is_empty() {
            return Err(AuthError::unauthorized("Empty Bearer token"));
        }

        let claims = auth_state.service.authenticate(token).inspect_err(|e| {
            tracing::debug!(error = %e, "Rejected bearer token");
        })?;

        Ok(BearerAuth(claims))
    }
}
