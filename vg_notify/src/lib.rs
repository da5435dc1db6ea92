//! ABOUTME: Motion notifications with a shared cooldown gate and channel adapters
//! ABOUTME: Sends alerts via desktop log, SMTP email and Discord/Slack webhooks

use async_trait::async_trait;
use chrono::{DateTime, Local};
use futures_util::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};
use vg_core::{format_timestamp, Clock, Id};

pub mod adapters;
pub mod config;
pub mod gate;

pub use adapters::{EmailNotifier, LogNotifier, WebhookNotifier, WebhookStyle};
pub use config::{EmailConfig, NotifyConfig};
pub use gate::NotificationGate;

/// Result type for notification operations
pub type Result<T> = std::result::Result<T, NotificationError>;

/// Errors a single channel can report
#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(String),
    #[error("Webhook error: {0}")]
    Webhook(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Channel error: {0}")]
    Channel(String),
}

/// Message handed to every channel for one trigger
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Id,
    pub title: String,
    pub body: String,
    pub timestamp: DateTime<Local>,
    /// Snapshot to attach where the channel supports files
    pub attachment: Option<PathBuf>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            id: Id::new(),
            title: title.into(),
            body: body.into(),
            timestamp,
            attachment: None,
        }
    }

    /// Standard motion alert; a missing or zero duration is left out of the text
    pub fn motion(timestamp: DateTime<Local>, duration: Option<f64>) -> Self {
        let body = match duration {
            Some(secs) if secs > 0.0 => format!(
                "Motion detected at {}. Duration: {:.1}s",
                format_timestamp(timestamp),
                secs
            ),
            _ => format!("Motion detected at {}", format_timestamp(timestamp)),
        };
        Self::new("Motion Detected!", body, timestamp)
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }
}

/// Core trait for notification channels
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one notification; no retries
    async fn send(&self, msg: &Notification) -> Result<()>;

    /// Channel name for logs and outcomes
    fn name(&self) -> &str;
}

/// What happened on one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelOutcome {
    pub channel: String,
    pub delivered: bool,
    pub error: Option<String>,
}

/// Result of one `notify` call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DispatchOutcome {
    /// The cooldown gate allowed this attempt
    pub permitted: bool,
    pub channels: Vec<ChannelOutcome>,
}

impl DispatchOutcome {
    /// True if any channel delivered
    pub fn success(&self) -> bool {
        self.channels.iter().any(|c| c.delivered)
    }
}

/// Fans one motion alert out to every registered channel under a shared cooldown
pub struct NotificationManager {
    channels: Vec<Arc<dyn Notifier>>,
    gate: Mutex<NotificationGate>,
    clock: Arc<dyn Clock>,
}

impl NotificationManager {
    pub fn new(cooldown_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            channels: Vec::new(),
            gate: Mutex::new(NotificationGate::new(cooldown_secs)),
            clock,
        }
    }

    /// Build the channels enabled in `config`
    pub fn from_config(config: &NotifyConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut manager = Self::new(config.cooldown_secs, clock);
        if !config.enabled {
            info!("Notifications disabled");
            return Ok(manager);
        }

        if config.desktop_enabled {
            manager.register(Arc::new(LogNotifier::desktop()));
        }
        if config.email_enabled {
            manager.register(Arc::new(EmailNotifier::new(config.email.clone())));
        }
        if let Some(url) = &config.discord_webhook {
            manager.register(Arc::new(WebhookNotifier::new(url.clone(), WebhookStyle::Discord)?));
        }
        if let Some(url) = &config.slack_webhook {
            manager.register(Arc::new(WebhookNotifier::new(url.clone(), WebhookStyle::Slack)?));
        }

        info!(channels = ?manager.channel_names(), "Notification channels configured");
        Ok(manager)
    }

    pub fn register(&mut self, channel: Arc<dyn Notifier>) {
        self.channels.push(channel);
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub fn can_notify(&self) -> bool {
        self.lock_gate().can_notify(self.clock.now())
    }

    fn lock_gate(&self) -> std::sync::MutexGuard<'_, NotificationGate> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Alert every channel about a finished motion event
    ///
    /// The gate is consulted once; a permitted attempt starts a new cooldown
    /// window whether or not any channel delivers.
    pub async fn notify(&self, duration: Option<f64>, snapshot: Option<&Path>) -> DispatchOutcome {
        let now = self.clock.now();
        let mut msg = Notification::motion(now, duration);
        if let Some(path) = snapshot {
            msg = msg.with_attachment(path);
        }
        self.dispatch(&msg).await
    }

    /// Send an arbitrary message under the same cooldown
    pub async fn dispatch(&self, msg: &Notification) -> DispatchOutcome {
        if self.channels.is_empty() {
            debug!("No notification channels registered");
            return DispatchOutcome::default();
        }

        let permitted = self.lock_gate().try_acquire(msg.timestamp);
        if !permitted {
            return DispatchOutcome {
                permitted: false,
                channels: Vec::new(),
            };
        }

        let sends = self.channels.iter().map(|channel| async move {
            let result = channel.send(msg).await;
            (channel.name().to_string(), result)
        });

        let channels: Vec<ChannelOutcome> = join_all(sends)
            .await
            .into_iter()
            .map(|(channel, result)| match result {
                Ok(()) => ChannelOutcome {
                    channel,
                    delivered: true,
                    error: None,
                },
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Notification channel failed");
                    ChannelOutcome {
                        channel,
                        delivered: false,
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect();

        let outcome = DispatchOutcome {
            permitted: true,
            channels,
        };
        info!(
            notification_id = %msg.id,
            success = outcome.success(),
            channels = outcome.channels.len(),
            "Motion notification dispatched"
        );
        outcome
    }
}
