//! ABOUTME: Notification channel implementations
//! ABOUTME: Desktop log, SMTP email and Discord/Slack webhook adapters

pub mod email;
pub mod log;
pub mod webhook;

pub use email::EmailNotifier;
pub use log::LogNotifier;
pub use webhook::{WebhookNotifier, WebhookStyle};
