//! ABOUTME: Webhook notification adapter for Discord and Slack incoming hooks
//! ABOUTME: Posts a JSON payload shaped for the target service

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::{Notification, NotificationError, Notifier, Result};

/// Bot name shown by the receiving service
pub const BOT_USERNAME: &str = "Motion Detector Bot";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Payload shape expected by the webhook endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookStyle {
    Discord,
    Slack,
}

impl WebhookStyle {
    fn channel_name(self) -> &'static str {
        match self {
            WebhookStyle::Discord => "discord",
            WebhookStyle::Slack => "slack",
        }
    }
}

#[derive(Debug)]
pub struct WebhookNotifier {
    client: Client,
    url: Url,
    style: WebhookStyle,
}

impl WebhookNotifier {
    pub fn new(url: Url, style: WebhookStyle) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, url, style))
    }

    pub fn with_client(client: Client, url: Url, style: WebhookStyle) -> Self {
        Self { client, url, style }
    }

    pub fn style(&self) -> WebhookStyle {
        self.style
    }

    /// Build the JSON body for this endpoint
    pub fn build_payload(&self, msg: &Notification) -> Value {
        match self.style {
            WebhookStyle::Discord => json!({
                "content": msg.body,
                "username": BOT_USERNAME,
            }),
            WebhookStyle::Slack => json!({
                "text": msg.body,
                "username": BOT_USERNAME,
                "icon_emoji": ":video_camera:",
            }),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, msg: &Notification) -> Result<()> {
        debug!(
            notification_id = %msg.id,
            channel = self.name(),
            "Sending webhook notification"
        );

        let response = self
            .client
            .post(self.url.clone())
            .json(&self.build_payload(msg))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(NotificationError::Webhook(format!(
                "{} webhook returned {}",
                self.name(),
                status
            )));
        }

        info!(
            notification_id = %msg.id,
            channel = self.name(),
            "Webhook notification sent"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        self.style.channel_name()
    }
}
