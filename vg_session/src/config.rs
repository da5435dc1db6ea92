//! ABOUTME: Worker lifecycle and recording settings for a detection session
//! ABOUTME: Retry policy, stop behavior, event retention and snapshot output

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionConfig {
    /// Close a still-open event with the stop time when the session ends
    pub close_open_event_on_stop: bool,
    /// Back-to-back acquisition failures before the worker gives up
    #[validate(range(min = 1, max = 10_000))]
    pub max_consecutive_failures: u32,
    /// Pause between acquisition retries
    #[validate(range(max = 60_000))]
    pub retry_backoff_ms: u64,
    /// Cap on retained events; unbounded when absent
    #[validate(range(min = 1))]
    pub max_events: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            close_open_event_on_stop: true,
            max_consecutive_failures: 30,
            retry_backoff_ms: 100,
            max_events: None,
        }
    }
}

impl SessionConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RecordingConfig {
    pub enabled: bool,
    pub output_dir: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_dir: PathBuf::from("recordings"),
        }
    }
}
