//! Authentication configuration.
//!
//! Token signing, user cache and password policy settings. Durations are
//! written in humantime form (`"24h"`, `"5m"`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "auth-service"
///
/// [auth.token]
/// secret = "change-me"
/// lifetime = "24h"
///
/// [auth.cache]
/// ttl = "5m"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Value of the `iss` claim in issued tokens. Tokens from any other
    /// issuer are rejected.
    pub issuer: String,

    /// Token signing configuration.
    pub token: TokenConfig,

    /// User cache configuration.
    pub cache: CacheConfig,

    /// Password policy.
    pub password: PasswordConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "auth-service".to_string(),
            token: TokenConfig::default(),
            cache: CacheConfig::default(),
            password: PasswordConfig::default(),
        }
    }
}

/// Token signing configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Shared HS256 secret.
    pub secret: String,

    /// How long an issued token stays valid.
    #[serde(with = "humantime_serde")]
    pub lifetime: Duration,
}

/// Secret used when none is configured. Fine for local runs only.
pub const DEVELOPMENT_SECRET: &str = "your-secret-key-change-in-production";

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: DEVELOPMENT_SECRET.to_string(),
            lifetime: Duration::from_secs(24 * 3600),
        }
    }
}

impl TokenConfig {
    /// Returns `true` if the built-in development secret is in use.
    #[must_use]
    pub fn uses_development_secret(&self) -> bool {
        self.secret == DEVELOPMENT_SECRET
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"***")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// User cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Time-to-live of a cached user record.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
        }
    }
}

/// Password policy and Argon2id cost parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordConfig {
    /// Minimum accepted password length, in characters.
    pub min_length: usize,

    /// Maximum accepted password length, in characters.
    pub max_length: usize,

    /// Argon2 memory cost in KiB.
    pub hash_memory_kib: u32,

    /// Argon2 number of passes.
    pub hash_iterations: u32,

    /// Argon2 degree of parallelism.
    pub hash_parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 6,
            max_length: 128,
            hash_memory_kib: argon2::Params::DEFAULT_M_COST,
            hash_iterations: argon2::Params::DEFAULT_T_COST,
            hash_parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.token.secret.is_empty() {
            return Err(ConfigError::Missing("auth.token.secret".to_string()));
        }

        if self.token.lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token lifetime must be greater than zero".to_string(),
            ));
        }

        if self.cache.ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "cache ttl must be greater than zero".to_string(),
            ));
        }

        if self.password.min_length == 0 {
            return Err(ConfigError::InvalidValue(
                "password min_length must be at least 1".to_string(),
            ));
        }

        if self.password.max_length < self.password.min_length {
            return Err(ConfigError::InvalidValue(format!(
                "password max_length ({}) is below min_length ({})",
                self.password.max_length, self.password.min_length
            )));
        }

        if let Err(e) = argon2::Params::new(
            self.password.hash_memory_kib,
            self.password.hash_iterations,
            self.password.hash_parallelism,
            None,
        ) {
            return Err(ConfigError::InvalidValue(format!(
                "invalid password hashing parameters: {e}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AuthConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.issuer, "auth-service");
        assert_eq!(config.token.lifetime, Duration::from_secs(86400));
        assert_eq!(config.cache.ttl, Duration::from_secs(300));
        assert!(config.token.uses_development_secret());
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut config = AuthConfig::default();
        config.token.secret = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut config = AuthConfig::default();
        config.token.lifetime = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = AuthConfig::default();
        config.cache.ttl = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_issuer_rejected() {
        let config = AuthConfig {
            issuer: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_password_bounds() {
        let mut config = AuthConfig::default();
        config.password.max_length = 3;
        assert!(config.validate().is_err());

        let mut config = AuthConfig::default();
        config.password.hash_iterations = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let mut config = TokenConfig::default();
        config.secret = "super-secret-value".to_string();
        assert!(!format!("{config:?}").contains("super-secret-value"));
    }

    #[test]
    fn test_parse_humantime_durations() {
        let config: AuthConfig = toml::from_str(
            r#"
            issuer = "warden"

            [token]
            secret = "s3cret"
            lifetime = "2h"

            [cache]
            ttl = "30s"
            "#,
        )
        .unwrap();

        assert_eq!(config.issuer, "warden");
        assert_eq!(config.token.lifetime, Duration::from_secs(7200));
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
        assert_eq!(config.password.min_length, 6);
    }
}
