use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Dispatcher is closed")]
    DispatcherClosed,

    #[error("Timed out waiting for {in_flight} notification job(s) to finish")]
    DrainTimeout { in_flight: usize },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotificationError {
    /// Returns `true` when retrying the same job later could succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SendFailed(_) | Self::DrainTimeout { .. })
    }
}
