//! ABOUTME: Cooldown gate deciding whether a notification attempt is allowed
//! ABOUTME: One permission covers every channel dispatched for the same trigger

use chrono::{DateTime, Duration, Local};
use tracing::debug;

/// Longest cooldown the gate will represent (about 31 years)
const MAX_COOLDOWN_SECS: u64 = 1_000_000_000;

/// Tracks the last permitted notification time
#[derive(Debug, Clone)]
pub struct NotificationGate {
    cooldown: Duration,
    last_permitted: Option<DateTime<Local>>,
}

impl NotificationGate {
    pub fn new(cooldown_secs: u64) -> Self {
        Self {
            cooldown: Duration::seconds(cooldown_secs.min(MAX_COOLDOWN_SECS) as i64),
            last_permitted: None,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn last_permitted(&self) -> Option<DateTime<Local>> {
        self.last_permitted
    }

    /// True if nothing was ever permitted or the cooldown has fully elapsed
    pub fn can_notify(&self, now: DateTime<Local>) -> bool {
        match self.last_permitted {
            None => true,
            Some(last) => now - last >= self.cooldown,
        }
    }

    /// Start a new cooldown window at `now`
    pub fn record(&mut self, now: DateTime<Local>) {
        self.last_permitted = Some(now);
    }

    /// Check and record in one step
    pub fn try_acquire(&mut self, now: DateTime<Local>) -> bool {
        if self.can_notify(now) {
            self.record(now);
            true
        } else {
            debug!(
                last_permitted = ?self.last_permitted,
                cooldown_secs = self.cooldown.num_seconds(),
                "Notification suppressed by cooldown"
            );
            false
        }
    }
}
