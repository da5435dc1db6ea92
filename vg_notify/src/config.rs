//! ABOUTME: Notification settings: cooldown, enabled channels and their endpoints
//! ABOUTME: SMTP credentials are redacted from debug output

use serde::{Deserialize, Serialize};
use url::Url;
use validator::Validate;

#[derive(Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct NotifyConfig {
    pub enabled: bool,
    /// Minimum seconds between two permitted notification attempts
    #[validate(range(max = 86_400))]
    pub cooldown_secs: u64,
    pub desktop_enabled: bool,
    pub email_enabled: bool,
    #[validate(nested)]
    pub email: EmailConfig,
    pub discord_webhook: Option<Url>,
    pub slack_webhook: Option<Url>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown_secs: 60,
            desktop_enabled: true,
            email_enabled: false,
            email: EmailConfig::default(),
            discord_webhook: None,
            slack_webhook: None,
        }
    }
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("enabled", &self.enabled)
            .field("cooldown_secs", &self.cooldown_secs)
            .field("desktop_enabled", &self.desktop_enabled)
            .field("email_enabled", &self.email_enabled)
            .field("email", &self.email)
            .field("discord_webhook", &self.discord_webhook.as_ref().map(|_| "[REDACTED]"))
            .field("slack_webhook", &self.slack_webhook.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_server: String,
    #[validate(range(min = 1))]
    pub smtp_port: u16,
    pub sender: String,
    pub password: String,
    pub recipient: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender: String::new(),
            password: String::new(),
            recipient: String::new(),
        }
    }
}

impl EmailConfig {
    /// All fields needed to log in and send are present
    pub fn is_complete(&self) -> bool {
        !self.smtp_server.is_empty()
            && self.smtp_port != 0
            && !self.sender.is_empty()
            && !self.password.is_empty()
            && !self.recipient.is_empty()
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("sender", &self.sender)
            .field("password", &"[REDACTED]")
            .field("recipient", &self.recipient)
            .finish()
    }
}
