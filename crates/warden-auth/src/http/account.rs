//! Register, login and profile endpoints.

use axum::{
    Json, Router,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AuthError;
use crate::middleware::{AuthState, BearerAuth};
use crate::service::{AuthResponse, LoginRequest, RegisterRequest};
use crate::storage::User;

// =============================================================================
// Response Types
// =============================================================================

/// Body returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthPayload {
    pub message: &'static str,
    pub user: User,
    pub token: String,
}

impl AuthPayload {
    fn new(message: &'static str, response: AuthResponse) -> Self {
        Self {
            message,
            user: response.user,
            token: response.token,
        }
    }
}

/// Body returned by the profile endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilePayload {
    pub user: User,
}

// =============================================================================
// Routes
// =============================================================================

/// Mounts the account endpoints.
pub fn auth_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    AuthState: FromRef<S>,
{
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/api/profile", get(profile_handler))
}

// =============================================================================
// HTTP Handlers
// =============================================================================

/// Handler for `POST /auth/register`.
///
/// # Errors
///
/// - 400 if the body is malformed or the email/password is rejected
/// - 409 if the email is already registered
pub async fn register_handler(
    State(state): State<AuthState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(request) = body.map_err(reject_body)?;
    let response = state.service.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthPayload::new("User registered successfully", response)),
    ))
}

/// Handler for `POST /auth/login`.
///
/// Unknown emails and wrong passwords get the same 401 response.
pub async fn login_handler(
    State(state): State<AuthState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthPayload>, AuthError> {
    let Json(request) = body.map_err(reject_body)?;
    let response = state.service.login(request).await?;

    Ok(Json(AuthPayload::new("Login successful", response)))
}

/// Handler for `GET /api/profile`.
///
/// Requires a bearer token; the user is looked up by the token subject.
pub async fn profile_handler(
    State(state): State<AuthState>,
    BearerAuth(claims): BearerAuth,
) -> Result<Json<ProfilePayload>, AuthError> {
    let user_id: Uuid = claims
        .user_id()
        .map_err(|_| AuthError::unauthorized("Token subject is not a user id"))?;

    let user = state.service.get_profile(user_id).await?;

    Ok(Json(ProfilePayload { user }))
}

fn reject_body(rejection: JsonRejection) -> AuthError {
    AuthError::invalid_request(rejection.body_text())
}

// =============================================================================
// Tests
// =============================================================================
