//! ABOUTME: Configuration management with validation and environment loading
//! ABOUTME: Camera, detection, recording, notification and session settings for vigil

use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;
use vg_core::{Error, Result};
use vg_notify::NotifyConfig;
use vg_session::{RecordingConfig, SessionConfig};
use vg_vision::MotionConfig;

/// Environment variable prefix; nested keys use `__`, e.g. `VIGIL_DETECTION__MIN_AREA`
pub const ENV_PREFIX: &str = "VIGIL";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub camera: CameraConfig,
    #[validate(nested)]
    pub detection: MotionConfig,
    #[validate(nested)]
    pub recording: RecordingConfig,
    #[validate(nested)]
    pub notifications: NotifyConfig,
    #[validate(nested)]
    pub session: SessionConfig,
}

/// Capture device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CameraConfig {
    pub index: u32,
    #[validate(range(min = 1, max = 7680))]
    pub width: u32,
    #[validate(range(min = 1, max = 4320))]
    pub height: u32,
    #[validate(range(min = 1, max = 240))]
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl Config {
    /// Load defaults overridden by `VIGIL_` environment variables
    pub fn load() -> Result<Self> {
        Self::build(None)
    }

    /// Load defaults, then `path` (TOML, JSON or YAML by extension), then the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::build(Some(path.as_ref()))
    }

    fn build(path: Option<&Path>) -> Result<Self> {
        let defaults = ConfigBuilder::try_from(&Config::default())
            .map_err(|e| Error::Config(format!("Failed to encode defaults: {}", e)))?;
        let mut builder = ConfigBuilder::builder().add_source(defaults);

        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "Loading config file");
            builder = builder.add_source(File::from(path).required(true));
        }

        // Environment variables have the highest priority
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build config: {}", e)))?;

        let parsed: Config = config
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to deserialize config: {}", e)))?;

        parsed
            .validate()
            .map_err(|e| Error::Config(format!("Config validation failed: {}", e)))?;

        Ok(parsed)
    }

    /// Immutable detection snapshot handed to the frame processor
    pub fn detection_settings(&self) -> MotionConfig {
        self.detection.clone()
    }
}
