//! ABOUTME: Draws region boxes, center markers and the status overlay onto frame copies
//! ABOUTME: Text is rasterized only when a font has been supplied

use crate::Region;
use ab_glyph::{FontArc, PxScale};
use chrono::{DateTime, Local};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use serde::Serialize;
use std::path::Path;
use vg_core::{format_timestamp, Error, Result};

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const CENTER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const MOTION_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const IDLE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Height of the status bar along the top edge
pub const STATUS_BAR_HEIGHT: u32 = 4;
pub const CENTER_RADIUS: i32 = 4;

/// Text shown on top of every processed frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusOverlay {
    pub timestamp: String,
    pub status: String,
    pub fps: String,
    pub motion: bool,
}

impl StatusOverlay {
    pub fn new(motion: bool, timestamp: DateTime<Local>, fps: f64) -> Self {
        Self {
            timestamp: format_timestamp(timestamp),
            status: if motion {
                "MOTION DETECTED".to_string()
            } else {
                "Monitoring...".to_string()
            },
            fps: format!("FPS: {:.1}", fps),
            motion,
        }
    }

    pub fn status_color(&self) -> Rgb<u8> {
        if self.motion {
            MOTION_COLOR
        } else {
            IDLE_COLOR
        }
    }
}

/// Renders detection results onto copies of frames
#[derive(Clone, Default)]
pub struct Annotator {
    font: Option<FontArc>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl Annotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(font: FontArc) -> Self {
        Self { font: Some(font) }
    }

    /// Load a TrueType/OpenType font for overlay text
    pub fn load_font(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| Error::Image(format!("Invalid font {}: {}", path.display(), e)))?;
        Ok(Self::with_font(font))
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Produce an annotated copy of `frame`
    pub fn annotate(
        &self,
        frame: &RgbImage,
        regions: &[Region],
        overlay: &StatusOverlay,
        mark_centers: bool,
    ) -> RgbImage {
        let mut canvas = frame.clone();

        for region in regions {
            draw_box(&mut canvas, region);
            if mark_centers {
                let (cx, cy) = region.center();
                draw_filled_circle_mut(
                    &mut canvas,
                    (cx as i32, cy as i32),
                    CENTER_RADIUS,
                    CENTER_COLOR,
                );
            }
        }

        self.draw_overlay(&mut canvas, overlay);
        canvas
    }

    fn draw_overlay(&self, canvas: &mut RgbImage, overlay: &StatusOverlay) {
        let (width, height) = canvas.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        let bar = Rect::at(0, 0).of_size(width, STATUS_BAR_HEIGHT.min(height));
        draw_filled_rect_mut(canvas, bar, overlay.status_color());

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                TEXT_COLOR,
                10,
                8,
                PxScale::from(16.0),
                font,
                &overlay.timestamp,
            );
            draw_text_mut(
                canvas,
                overlay.status_color(),
                10,
                26,
                PxScale::from(19.0),
                font,
                &overlay.status,
            );
            draw_text_mut(
                canvas,
                TEXT_COLOR,
                10,
                46,
                PxScale::from(16.0),
                font,
                &overlay.fps,
            );
        }
    }
}

/// Two pixel box: the region outline plus one ring inside it
fn draw_box(canvas: &mut RgbImage, region: &Region) {
    if region.width == 0 || region.height == 0 {
        return;
    }

    let outer = Rect::at(region.x as i32, region.y as i32).of_size(region.width, region.height);
    draw_hollow_rect_mut(canvas, outer, BOX_COLOR);

    if region.width > 2 && region.height > 2 {
        let inner = Rect::at(region.x as i32 + 1, region.y as i32 + 1)
            .of_size(region.width - 2, region.height - 2);
        draw_hollow_rect_mut(canvas, inner, BOX_COLOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_support::local_time;

    fn region(x: u32, y: u32, width: u32, height: u32) -> Region {
        Region {
            x,
            y,
            width,
            height,
            area: (width * height) as f64,
        }
    }

    #[test]
    fn test_overlay_text() {
        let overlay = StatusOverlay::new(true, local_time(2024, 3, 9, 14, 5, 7), 29.97);
        assert_eq!(overlay.timestamp, "2024-03-09 14:05:07");
        assert_eq!(overlay.status, "MOTION DETECTED");
        assert_eq!(overlay.fps, "FPS: 30.0");
        assert_eq!(overlay.status_color(), MOTION_COLOR);

        let idle = StatusOverlay::new(false, local_time(2024, 3, 9, 14, 5, 7), 0.0);
        assert_eq!(idle.status, "Monitoring...");
        assert_eq!(idle.fps, "FPS: 0.0");
        assert_eq!(idle.status_color(), IDLE_COLOR);
    }

    #[test]
    fn test_annotate_leaves_original_untouched() {
        let frame = RgbImage::from_pixel(80, 60, Rgb([10, 10, 10]));
        let overlay = StatusOverlay::new(true, local_time(2024, 1, 1, 0, 0, 0), 15.0);

        let annotated = Annotator::new().annotate(&frame, &[region(20, 20, 30, 20)], &overlay, true);

        assert!(frame.pixels().all(|p| p.0 == [10, 10, 10]));
        assert_ne!(annotated, frame);
    }

    #[test]
    fn test_box_is_two_pixels_thick() {
        let frame = RgbImage::from_pixel(80, 60, Rgb([10, 10, 10]));
        let overlay = StatusOverlay::new(true, local_time(2024, 1, 1, 0, 0, 0), 15.0);

        let annotated = Annotator::new().annotate(&frame, &[region(20, 20, 30, 20)], &overlay, false);

        assert_eq!(*annotated.get_pixel(20, 30), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(21, 30), BOX_COLOR);
        assert_eq!(*annotated.get_pixel(22, 30), Rgb([10, 10, 10]));
        assert_eq!(*annotated.get_pixel(49, 39), BOX_COLOR);
        // No center marker requested
        assert_eq!(*annotated.get_pixel(35, 30), Rgb([10, 10, 10]));
    }

    #[test]
    fn test_center_marker() {
        let frame = RgbImage::from_pixel(80, 60, Rgb([10, 10, 10]));
        let overlay = StatusOverlay::new(true, local_time(2024, 1, 1, 0, 0, 0), 15.0);

        let annotated = Annotator::new().annotate(&frame, &[region(20, 20, 30, 20)], &overlay, true);
        assert_eq!(*annotated.get_pixel(35, 30), CENTER_COLOR);
    }

    #[test]
    fn test_status_bar_color() {
        let frame = RgbImage::from_pixel(40, 30, Rgb([10, 10, 10]));
        let annotator = Annotator::new();

        let busy = StatusOverlay::new(true, local_time(2024, 1, 1, 0, 0, 0), 0.0);
        let idle = StatusOverlay::new(false, local_time(2024, 1, 1, 0, 0, 0), 0.0);

        assert_eq!(*annotator.annotate(&frame, &[], &busy, false).get_pixel(5, 1), MOTION_COLOR);
        assert_eq!(*annotator.annotate(&frame, &[], &idle, false).get_pixel(5, 1), IDLE_COLOR);
        assert_eq!(
            *annotator.annotate(&frame, &[], &idle, false).get_pixel(5, 10),
            Rgb([10, 10, 10])
        );
    }

    #[test]
    fn test_missing_font_file() {
        let result = Annotator::load_font("/nonexistent/font.ttf");
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!Annotator::new().has_font());
    }
}
