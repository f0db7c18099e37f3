use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

/// Notification pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Maximum number of notification jobs running at the same time.
    pub max_concurrent: usize,

    /// How long shutdown waits for in-flight jobs.
    #[serde(with = "humantime_serde")]
    pub drain_timeout: Duration,

    /// Outgoing mail server. Notifications are only logged when unset.
    pub smtp: Option<SmtpConfig>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            drain_timeout: Duration::from_secs(10),
            smtp: None,
        }
    }
}

impl NotificationsConfig {
    pub fn validate(&self) -> Result<(), NotificationError> {
        if self.max_concurrent == 0 {
            return Err(NotificationError::InvalidConfig(
                "max_concurrent must be greater than zero".into(),
            ));
        }
        if let Some(smtp) = &self.smtp {
            smtp.validate()?;
        }
        Ok(())
    }
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Plain connection upgraded with STARTTLS.
    #[default]
    Starttls,
    /// TLS from the first byte (SMTPS).
    Implicit,
    /// Unencrypted. Only meant for local mail catchers.
    None,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub tls: SmtpTls,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            tls: SmtpTls::default(),
            username: None,
            password: None,
            from_email: String::new(),
            from_name: "Warden".to_string(),
        }
    }
}

impl SmtpConfig {
    pub fn validate(&self) -> Result<(), NotificationError> {
        if self.host.trim().is_empty() {
            return Err(NotificationError::InvalidConfig("smtp host is empty".into()));
        }
        if self.port == 0 {
            return Err(NotificationError::InvalidConfig("smtp port is zero".into()));
        }
        if self.from_email.trim().is_empty() {
            return Err(NotificationError::InvalidConfig(
                "smtp from_email is empty".into(),
            ));
        }
        if self.username.is_some() != self.password.is_some() {
            return Err(NotificationError::InvalidConfig(
                "smtp username and password must be set together".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}
