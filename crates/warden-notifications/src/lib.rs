pub mod adapters;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod templates;

pub use adapters::{LogNotifier, Notifier, SmtpNotifier};
pub use config::{NotificationsConfig, SmtpConfig, SmtpTls};
pub use dispatcher::{DispatchSlot, DispatcherStats, NotificationDispatcher};
pub use error::NotificationError;
pub use templates::{RenderedContent, Template};
