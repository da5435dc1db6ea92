//! ABOUTME: Frame sources feeding the session worker
//! ABOUTME: Image-sequence directories and in-memory frame lists

use image::RgbImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vg_core::{Error, Result};

/// Blocking supplier of color frames
///
/// `Ok(None)` ends the stream. `Err(Error::Acquisition)` is a transient
/// failure the worker may retry.
pub trait FrameSource: Send {
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Label for logs
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

/// Replays a directory of JPEG/PNG files in file-name order
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "Frame directory does not exist: {}",
                dir.display()
            )));
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        files.sort();

        info!(dir = %dir.display(), frames = files.len(), "Opened image sequence");
        Ok(Self {
            dir,
            files,
            next: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.files.len() - self.next
    }
}

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref(),
        Some("jpg") | Some("jpeg") | Some("png")
    )
}

impl FrameSource for ImageSequenceSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.files.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        debug!(path = %path.display(), "Reading frame");
        image::open(path)
            .map(|img| Some(img.to_rgb8()))
            .map_err(|e| Error::Acquisition(format!("{}: {}", path.display(), e)))
    }

    fn describe(&self) -> String {
        format!("image sequence {}", self.dir.display())
    }
}

/// In-memory frames; `None` entries read as acquisition failures
#[derive(Debug, Default)]
pub struct VecSource {
    reads: VecDeque<Option<RgbImage>>,
}

impl VecSource {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self::from_reads(frames.into_iter().map(Some).collect())
    }

    pub fn from_reads(reads: Vec<Option<RgbImage>>) -> Self {
        Self {
            reads: reads.into(),
        }
    }
}

impl FrameSource for VecSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        match self.reads.pop_front() {
            None => Ok(None),
            Some(Some(frame)) => Ok(Some(frame)),
            Some(None) => Err(Error::Acquisition("no frame available".to_string())),
        }
    }

    fn describe(&self) -> String {
        format!("{} in-memory reads", self.reads.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_vec_source_reads_in_order() {
        let a = RgbImage::from_pixel(4, 4, Rgb([1, 1, 1]));
        let b = RgbImage::from_pixel(4, 4, Rgb([2, 2, 2]));
        let mut source = VecSource::from_reads(vec![Some(a.clone()), None, Some(b.clone())]);

        assert_eq!(source.read_frame().unwrap(), Some(a));
        assert!(matches!(source.read_frame(), Err(Error::Acquisition(_))));
        assert_eq!(source.read_frame().unwrap(), Some(b));
        assert_eq!(source.read_frame().unwrap(), None);
    }

    #[test]
    fn test_image_sequence_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("frame_002.png", 20u8), ("frame_001.png", 10u8)] {
            RgbImage::from_pixel(8, 6, Rgb([shade, shade, shade]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert_eq!(source.len(), 2);

        let first = source.read_frame().unwrap().unwrap();
        assert_eq!(first.get_pixel(0, 0), &Rgb([10, 10, 10]));
        assert_eq!(first.dimensions(), (8, 6));
        let second = source.read_frame().unwrap().unwrap();
        assert_eq!(second.get_pixel(0, 0), &Rgb([20, 20, 20]));
        assert_eq!(source.read_frame().unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_acquisition_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"not really a jpeg").unwrap();

        let mut source = ImageSequenceSource::open(dir.path()).unwrap();
        assert!(matches!(source.read_frame(), Err(Error::Acquisition(_))));
        assert_eq!(source.read_frame().unwrap(), None);
    }

    #[test]
    fn test_missing_directory() {
        let err = ImageSequenceSource::open("/nonexistent/vigil-frames").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
