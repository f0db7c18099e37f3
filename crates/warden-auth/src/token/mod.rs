//! Session token issuance and validation.
//!
//! This module provides:
//!
//! - HS256 JWT signing of session claims
//! - Stateless validation of presented tokens

pub mod jwt;

pub use jwt::{JwtError, SessionClaims, SessionClaimsBuilder, TokenService};

use crate::config::AuthConfig;

impl TokenService {
    /// Builds the token service from the auth configuration.
    ///
    /// # Errors
    /// Returns `InvalidKey` if the configured secret is empty.
    pub fn from_config(config: &AuthConfig) -> Result<Self, JwtError> {
        Self::new(
            config.token.secret.as_bytes(),
            config.issuer.clone(),
            config.token.lifetime,
        )
    }
}
