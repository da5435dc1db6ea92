//! ABOUTME: SMTP email adapter using lettre over STARTTLS
//! ABOUTME: Attaches the event snapshot when one is available

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::{Notification, NotificationError, Notifier, Result};

pub const SUBJECT: &str = "Motion Detector Alert";
const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct EmailNotifier {
    config: EmailConfig,
}

impl EmailNotifier {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Compose the message, attaching `msg.attachment` if it can be read
    pub async fn build_message(&self, msg: &Notification) -> Result<Message> {
        let from: Mailbox = self
            .config
            .sender
            .parse()
            .map_err(|e| NotificationError::Smtp(format!("invalid sender: {e}")))?;
        let to: Mailbox = self
            .config
            .recipient
            .parse()
            .map_err(|e| NotificationError::Smtp(format!("invalid recipient: {e}")))?;

        let builder = Message::builder().from(from).to(to).subject(SUBJECT);
        let text = SinglePart::plain(msg.body.clone());

        let message = match &msg.attachment {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => {
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "snapshot".to_string());
                    let content_type = ContentType::parse(content_type_for(path))
                        .map_err(|e| NotificationError::Smtp(e.to_string()))?;
                    builder.multipart(
                        MultiPart::mixed()
                            .singlepart(text)
                            .singlepart(Attachment::new(filename).body(bytes, content_type)),
                    )
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Snapshot unreadable, sending without it");
                    builder.singlepart(text)
                }
            },
            None => builder.singlepart(text),
        };

        message.map_err(|e| NotificationError::Smtp(e.to_string()))
    }
}

/// MIME type from the snapshot extension
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, msg: &Notification) -> Result<()> {
        if !self.config.is_complete() {
            return Err(NotificationError::Channel(
                "email configuration incomplete".to_string(),
            ));
        }

        let email = self.build_message(msg).await?;
        debug!(
            notification_id = %msg.id,
            server = %self.config.smtp_server,
            port = self.config.smtp_port,
            "Sending email notification"
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)
            .map_err(|e| NotificationError::Smtp(e.to_string()))?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.sender.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| NotificationError::Smtp(e.to_string()))?;

        info!(
            notification_id = %msg.id,
            recipient = %self.config.recipient,
            "Email notification sent"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "email"
    }
}
