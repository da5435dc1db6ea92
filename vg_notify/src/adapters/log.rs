//! ABOUTME: Desktop channel that surfaces alerts through the tracing log
//! ABOUTME: Always succeeds; used when no native notification daemon is wired in

use async_trait::async_trait;
use tracing::info;

use crate::{Notification, Notifier, Result};

#[derive(Debug, Clone)]
pub struct LogNotifier {
    name: String,
}

impl LogNotifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The channel registered for `desktop_enabled`
    pub fn desktop() -> Self {
        Self::new("desktop")
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, msg: &Notification) -> Result<()> {
        info!(
            channel = %self.name,
            notification_id = %msg.id,
            title = %msg.title,
            attachment = ?msg.attachment,
            "{}",
            msg.body
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::monday_at;

    #[tokio::test]
    async fn test_desktop_always_delivers() {
        let notifier = LogNotifier::desktop();
        assert_eq!(notifier.name(), "desktop");
        let msg = Notification::motion(monday_at(9, 0, 0), Some(1.5));
        assert!(notifier.send(&msg).await.is_ok());
    }
}
