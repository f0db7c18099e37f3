//! Authentication error types.
//!
//! [`AuthError`] is what every account flow returns. The HTTP layer maps it to
//! a status code (see `middleware::error`), so variants are chosen by what the
//! caller should see, not by which collaborator failed.

use std::fmt;

/// Why a presented token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenErrorKind {
    /// The token could not be parsed.
    Malformed,
    /// The token's expiry time has passed.
    Expired,
    /// The token's not-before time is still in the future.
    NotYetValid,
    /// The signature does not match the token contents.
    InvalidSignature,
    /// The token parsed and verified but carries unexpected claims.
    InvalidClaims,
}

impl fmt::Display for TokenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed token"),
            Self::Expired => write!(f, "token expired"),
            Self::NotYetValid => write!(f, "token not yet valid"),
            Self::InvalidSignature => write!(f, "invalid signature"),
            Self::InvalidClaims => write!(f, "invalid claims"),
        }
    }
}

/// Errors returned by the account flows.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// An account with this email is already registered.
    #[error("User with this email already exists")]
    AlreadyExists,

    /// Unknown email or wrong password. The two cases are deliberately
    /// reported identically.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The requested record does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// What was looked up.
        message: String,
    },

    /// The bearer token was rejected.
    #[error("Invalid token: {kind}")]
    TokenInvalid {
        /// Why the token was rejected.
        kind: TokenErrorKind,
    },

    /// The request carries no credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Description of what is missing.
        message: String,
    },

    /// The request is malformed or fails input validation.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// A collaborator (storage, password hashing) failed.
    #[error("Upstream failure during {operation}: {message}")]
    Upstream {
        /// The operation that was in progress.
        operation: String,
        /// The collaborator's error message.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `TokenInvalid` error.
    #[must_use]
    pub fn token_invalid(kind: TokenErrorKind) -> Self {
        Self::TokenInvalid { kind }
    }

    /// Creates a new `Unauthorized` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Upstream` error, wrapping a collaborator failure with
    /// the operation that was in progress.
    #[must_use]
    pub fn upstream(operation: impl Into<String>, error: impl fmt::Display) -> Self {
        Self::Upstream {
            operation: operation.into(),
            message: error.to_string(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadyExists
                | Self::InvalidCredentials
                | Self::NotFound { .. }
                | Self::TokenInvalid { .. }
                | Self::Unauthorized { .. }
                | Self::InvalidRequest { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::Configuration { .. } | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is a token-related error.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(self, Self::TokenInvalid { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AlreadyExists => ErrorCategory::Conflict,
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::TokenInvalid { .. } => ErrorCategory::Token,
            Self::Unauthorized { .. } => ErrorCategory::Authentication,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::Upstream { .. } => ErrorCategory::Upstream,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Identity verification failed.
    Authentication,
    /// Token validation failed.
    Token,
    /// Request validation failed.
    Validation,
    /// Uniqueness conflict.
    Conflict,
    /// Lookup miss.
    NotFound,
    /// Storage or hashing collaborator failure.
    Upstream,
    /// Configuration errors.
    Configuration,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::NotFound => write!(f, "not_found"),
            Self::Upstream => write!(f, "upstream"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            AuthError::AlreadyExists.to_string(),
            "User with this email already exists"
        );
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );

        let err = AuthError::token_invalid(TokenErrorKind::Expired);
        assert_eq!(err.to_string(), "Invalid token: token expired");

        let err = AuthError::upstream("create user", "connection reset");
        assert_eq!(
            err.to_string(),
            "Upstream failure during create user: connection reset"
        );
    }

    #[test]
    fn test_error_predicates() {
        assert!(AuthError::AlreadyExists.is_client_error());
        assert!(AuthError::InvalidCredentials.is_client_error());
        assert!(!AuthError::InvalidCredentials.is_server_error());

        let upstream = AuthError::upstream("find user", "timeout");
        assert!(upstream.is_server_error());
        assert!(!upstream.is_client_error());

        assert!(AuthError::token_invalid(TokenErrorKind::Malformed).is_token_error());
        assert!(!AuthError::not_found("user").is_token_error());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(AuthError::AlreadyExists.category(), ErrorCategory::Conflict);
        assert_eq!(
            AuthError::token_invalid(TokenErrorKind::InvalidSignature).category(),
            ErrorCategory::Token
        );
        assert_eq!(
            AuthError::upstream("hash password", "boom").category(),
            ErrorCategory::Upstream
        );
        assert_eq!(ErrorCategory::NotFound.to_string(), "not_found");
    }
}
