pub mod email;

use async_trait::async_trait;
use tracing::info;

use crate::error::NotificationError;

pub use email::SmtpNotifier;

/// Delivers user-facing notifications.
///
/// Implementations are called from inside a dispatcher slot, never from the
/// request path, so they are free to block on network I/O.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends the welcome message to a newly registered user.
    async fn send_welcome(&self, address: &str, display_name: &str)
    -> Result<(), NotificationError>;
}

/// Notifier that only records the notification in the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_welcome(
        &self,
        address: &str,
        display_name: &str,
    ) -> Result<(), NotificationError> {
        info!(
            recipient = %address,
            name = %display_name,
            "Welcome notification (delivery disabled)"
        );
        Ok(())
    }
}
