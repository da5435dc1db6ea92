//! ABOUTME: Recording hooks driven by motion event transitions
//! ABOUTME: A no-op recorder and one that saves the first annotated frame as JPEG

use chrono::{DateTime, Local};
use image::{ImageFormat, RgbImage};
use std::path::PathBuf;
use tracing::{debug, info};
use vg_core::{Error, Result};

/// Receives frames while an event is open
pub trait Recorder: Send {
    /// An event opened at `at`; `frame` is its first annotated frame
    fn start(&mut self, at: DateTime<Local>, frame: &RgbImage) -> Result<()>;

    /// Another frame inside the open event
    fn write(&mut self, frame: &RgbImage) -> Result<()>;

    /// The event closed; returns the artifact to attach to notifications
    fn stop(&mut self) -> Result<Option<PathBuf>>;
}

#[derive(Debug, Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn start(&mut self, _at: DateTime<Local>, _frame: &RgbImage) -> Result<()> {
        Ok(())
    }

    fn write(&mut self, _frame: &RgbImage) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

/// Saves one JPEG per event under `output_dir`
#[derive(Debug)]
pub struct SnapshotRecorder {
    output_dir: PathBuf,
    current: Option<PathBuf>,
    frames: u64,
}

impl SnapshotRecorder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            current: None,
            frames: 0,
        }
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    /// `motion_YYYYmmdd_HHMMSS_mmm.jpg`
    pub fn file_name(at: DateTime<Local>) -> String {
        format!("motion_{}.jpg", at.format("%Y%m%d_%H%M%S_%3f"))
    }
}

impl Recorder for SnapshotRecorder {
    fn start(&mut self, at: DateTime<Local>, frame: &RgbImage) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(Self::file_name(at));
        frame
            .save_with_format(&path, ImageFormat::Jpeg)
            .map_err(|e| Error::Image(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), "Saved motion snapshot");
        self.current = Some(path);
        self.frames = 1;
        Ok(())
    }

    fn write(&mut self, _frame: &RgbImage) -> Result<()> {
        if self.current.is_some() {
            self.frames += 1;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<PathBuf>> {
        let path = self.current.take();
        if path.is_some() {
            debug!(frames = self.frames, "Recording closed");
        }
        self.frames = 0;
        Ok(path)
    }
}
