//! Session token issuance and validation.
//!
//! Tokens are compact JWTs signed with HS256 using a shared secret. Validation
//! is stateless: it depends only on the token bytes, the secret and the local
//! clock. No leeway is applied to `exp` and `nbf`.
//!
//! ## Example
//!
//! ```ignore
//! use warden_auth::token::TokenService;
//!
//! let tokens = TokenService::new(b"secret", "auth-service", Duration::from_secs(3600))?;
//!
//! let token = tokens.issue(user.id, &user.email)?;
//! let claims = tokens.validate(&token)?;
//! assert_eq!(claims.email, user.email);
//! ```

use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{AuthError, TokenErrorKind};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during JWT operations.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    EncodingError {
        /// Description of the encoding error.
        message: String,
    },

    /// The token could not be parsed.
    #[error("Malformed token: {message}")]
    Malformed {
        /// Description of the parse failure.
        message: String,
    },

    /// The token has expired.
    #[error("Token expired")]
    Expired,

    /// The token is not valid yet.
    #[error("Token not yet valid")]
    NotYetValid,

    /// The token signature is invalid.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// Invalid key material.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `EncodingError`.
    #[must_use]
    pub fn encoding_error(message: impl Into<String>) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if the token itself was rejected (as opposed to a
    /// signing or key failure on our side).
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        self.kind().is_some()
    }

    /// The rejection reason, for validation errors.
    #[must_use]
    pub fn kind(&self) -> Option<TokenErrorKind> {
        match self {
            Self::Malformed { .. } => Some(TokenErrorKind::Malformed),
            Self::Expired => Some(TokenErrorKind::Expired),
            Self::NotYetValid => Some(TokenErrorKind::NotYetValid),
            Self::InvalidSignature => Some(TokenErrorKind::InvalidSignature),
            Self::InvalidClaims { .. } => Some(TokenErrorKind::InvalidClaims),
            Self::EncodingError { .. } | Self::InvalidKey { .. } => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidSubject
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::InvalidAlgorithm => Self::invalid_claims(err.to_string()),
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidEcdsaKey => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::malformed(err.to_string()),
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err.kind() {
            Some(kind) => AuthError::token_invalid(kind),
            None => AuthError::internal(err.to_string()),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issuer.
    pub iss: String,
    /// Subject: the user id.
    pub sub: String,
    /// The user's email at issuance.
    pub email: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Not before (Unix seconds).
    pub nbf: i64,
    /// Expires at (Unix seconds).
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

impl SessionClaims {
    /// Creates a builder. Defaults to issuance now with a one hour lifetime.
    pub fn builder(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        email: impl Into<String>,
    ) -> SessionClaimsBuilder {
        SessionClaimsBuilder {
            issuer: issuer.into(),
            subject: subject.into(),
            email: email.into(),
            issued_at: OffsetDateTime::now_utc().unix_timestamp(),
            lifetime: Duration::from_secs(3600),
        }
    }

    /// Parses the subject as a user id.
    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|e| JwtError::invalid_claims(format!("sub: {e}")))
    }
}

/// Builder for [`SessionClaims`].
#[derive(Debug, Clone)]
pub struct SessionClaimsBuilder {
    issuer: String,
    subject: String,
    email: String,
    issued_at: i64,
    lifetime: Duration,
}

impl SessionClaimsBuilder {
    /// Sets the issuance time (Unix seconds). `nbf` follows it.
    pub fn issued_at(mut self, unix_seconds: i64) -> Self {
        self.issued_at = unix_seconds;
        self
    }

    /// Sets how long the token stays valid after issuance.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn build(self) -> SessionClaims {
        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        SessionClaims {
            iss: self.issuer,
            sub: self.subject,
            email: self.email,
            iat: self.issued_at,
            nbf: self.issued_at,
            exp: self.issued_at.saturating_add(lifetime),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

// ============================================================================
// Token Service
// ============================================================================

/// Issues and validates session tokens.
///
/// This service is thread-safe (`Send + Sync`) and can be shared across
/// async tasks.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    lifetime: Duration,
}

impl TokenService {
    /// Creates a token service.
    ///
    /// # Arguments
    /// * `secret` - Shared HS256 secret
    /// * `issuer` - The issuer claim value; tokens from other issuers are rejected
    /// * `lifetime` - How long issued tokens stay valid
    ///
    /// # Errors
    /// Returns `InvalidKey` if the secret is empty.
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        lifetime: Duration,
    ) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::invalid_key("signing secret is empty"));
        }

        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_issuer(&[&issuer]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            issuer,
            lifetime,
        })
    }

    /// Issues a token for `subject` with the configured lifetime.
    ///
    /// # Errors
    /// Returns an error only if signing fails.
    pub fn issue(&self, subject: impl ToString, email: &str) -> Result<String, JwtError> {
        let claims = SessionClaims::builder(&self.issuer, subject.to_string(), email)
            .lifetime(self.lifetime)
            .build();
        self.encode(&claims)
    }

    /// Signs arbitrary session claims.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::encoding_error(e.to_string()))
    }

    /// Verifies the signature and time window of `token` and returns its claims.
    ///
    /// # Errors
    /// `InvalidSignature`, `Expired`, `NotYetValid`, `Malformed` or
    /// `InvalidClaims` depending on why the token was rejected.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, JwtError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(JwtError::from)
    }

    /// Returns the issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the token lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

// ============================================================================
// Tests
// ============================================================================
