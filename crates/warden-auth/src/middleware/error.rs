//! Error response handling.
//!
//! This module implements `IntoResponse` for `AuthError`. Every error becomes
//! a JSON body `{"error": <code>, "message": <text>}`; 401 responses also carry
//! a `WWW-Authenticate: Bearer` challenge.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = error_details(&self);

        if status.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Request failed");
        }

        let body = json!({
            "error": code,
            "message": message,
        });

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(code, &message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Extracts error details from an AuthError.
///
/// Returns (HTTP status, error code, client-facing message). Server errors get
/// a generic message; the details only go to the log.
fn error_details(error: &AuthError) -> (StatusCode, &'static str, String) {
    match error {
        AuthError::AlreadyExists => (StatusCode::CONFLICT, "already_exists", error.to_string()),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            error.to_string(),
        ),
        AuthError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found", error.to_string()),
        AuthError::TokenInvalid { .. } => {
            (StatusCode::UNAUTHORIZED, "invalid_token", error.to_string())
        }
        AuthError::Unauthorized { .. } => {
            (StatusCode::UNAUTHORIZED, "unauthorized", error.to_string())
        }
        AuthError::InvalidRequest { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_request", error.to_string())
        }
        AuthError::Upstream { .. } | AuthError::Configuration { .. } | AuthError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "Internal server error".to_string(),
        ),
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    // Escape quotes in description
    let escaped_desc = description.replace('\"', "\\\"");
    format!(
        "Bearer realm=\"warden\", error=\"{}\", error_description=\"{}\"",
        error, escaped_desc
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenErrorKind;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = AuthError::unauthorized("Missing Authorization header").into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(www_auth.contains("Bearer"));
        assert!(www_auth.contains("realm=\"warden\""));
        assert!(www_auth.contains("error=\"unauthorized\""));
    }

    #[tokio::test]
    async fn test_expired_token_response() {
        let response = AuthError::token_invalid(TokenErrorKind::Expired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(www_auth.contains("error=\"invalid_token\""));

        let body = body_json(response).await;
        assert_eq!(body["message"], "Invalid token: token expired");
    }

    #[tokio::test]
    async fn test_conflict_response() {
        let response = AuthError::AlreadyExists.into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));

        let body = body_json(response).await;
        assert_eq!(body["error"], "already_exists");
    }

    #[tokio::test]
    async fn test_invalid_credentials_response() {
        let response = AuthError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"], "invalid_credentials");
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(
            AuthError::invalid_request("bad").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::not_found("user").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::configuration("bad").into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_upstream_details_hidden() {
        let response = AuthError::upstream("create user", "password=hunter2 rejected").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "server_error");
        assert!(!body["message"].as_str().unwrap().contains("hunter2"));
    }
}
