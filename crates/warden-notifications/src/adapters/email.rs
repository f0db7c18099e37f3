use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::info;

use super::Notifier;
use crate::config::{SmtpConfig, SmtpTls};
use crate::error::NotificationError;
use crate::templates::{RenderedContent, Template};

/// Sends notifications as plain-text email over SMTP.
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    service_name: String,
    welcome: Template,
}

impl SmtpNotifier {
    /// Builds the SMTP transport. No connection is opened until the first send.
    pub fn new(config: &SmtpConfig) -> Result<Self, NotificationError> {
        config.validate()?;

        let from_address = config
            .from_email
            .parse()
            .map_err(|e| NotificationError::InvalidConfig(format!("Invalid from: {}", e)))?;
        let from = Mailbox::new(Some(config.from_name.clone()), from_address);

        let mut mailer_builder = match config.tls {
            SmtpTls::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotificationError::InvalidConfig(e.to_string()))?,
            SmtpTls::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| NotificationError::InvalidConfig(e.to_string()))?,
            SmtpTls::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        }
        .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            mailer_builder =
                mailer_builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: mailer_builder.build(),
            from,
            service_name: config.from_name.clone(),
            welcome: Template::welcome(),
        })
    }

    fn build_message(&self, to: &str, content: RenderedContent) -> Result<Message, NotificationError> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| NotificationError::InvalidRecipient(format!("{}: {}", to, e)))?;

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(content.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(content.body)
            .map_err(|e| NotificationError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_welcome(
        &self,
        address: &str,
        display_name: &str,
    ) -> Result<(), NotificationError> {
        let content = self.welcome.render(&[
            ("name", display_name),
            ("service", self.service_name.as_str()),
        ]);
        let message = self.build_message(address, content)?;

        info!(recipient = %address, "Sending welcome email");

        self.mailer
            .send(message)
            .await
            .map_err(|e| NotificationError::SendFailed(e.to_string()))?;

        info!(recipient = %address, "Welcome email sent");
        Ok(())
    }
}
