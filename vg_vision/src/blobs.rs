//! ABOUTME: Turns a binary foreground mask into bounding-box regions
//! ABOUTME: Cleans the mask morphologically and keeps outer contours above a minimum area

use crate::Region;
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::morphology::{grayscale_close, grayscale_open, Mask};
use imageproc::point::Point;
use tracing::debug;

/// Side of the elliptical structuring element used to clean masks
pub const CLEAN_KERNEL_SIZE: u32 = 5;

/// 5x5 ellipse: a full 3-row middle band plus the center pixel of the top and bottom rows
pub fn ellipse_kernel() -> Mask {
    let last = CLEAN_KERNEL_SIZE - 1;
    let center = CLEAN_KERNEL_SIZE / 2;
    let footprint = GrayImage::from_fn(CLEAN_KERNEL_SIZE, CLEAN_KERNEL_SIZE, |x, y| {
        let cap_row = y == 0 || y == last;
        Luma([if cap_row && x != center { 0 } else { 255 }])
    });
    Mask::from_image(&footprint, center as u8, center as u8)
}

/// Extracts motion regions from a foreground mask
#[derive(Debug, Clone)]
pub struct BlobExtractor {
    min_area: u32,
    kernel: Mask,
}

impl BlobExtractor {
    pub fn new(min_area: u32) -> Self {
        Self {
            min_area,
            kernel: ellipse_kernel(),
        }
    }

    pub fn min_area(&self) -> u32 {
        self.min_area
    }

    pub fn set_min_area(&mut self, min_area: u32) {
        self.min_area = min_area;
    }

    /// Opening removes speckles, closing fills small gaps
    pub fn clean(&self, mask: &GrayImage) -> GrayImage {
        let opened = grayscale_open(mask, &self.kernel);
        grayscale_close(&opened, &self.kernel)
    }

    /// Regions whose outer boundary encloses at least `min_area` pixels
    pub fn extract(&self, mask: &GrayImage) -> Vec<Region> {
        if mask.width() == 0 || mask.height() == 0 || mask.iter().all(|&v| v == 0) {
            return Vec::new();
        }

        let cleaned = self.clean(mask);
        let contours = find_contours::<i32>(&cleaned);
        let mut discarded = 0usize;

        let regions: Vec<Region> = contours
            .iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
            .filter_map(|c| {
                let region = bounding_region(&c.points)?;
                if region.area >= self.min_area as f64 {
                    Some(region)
                } else {
                    discarded += 1;
                    None
                }
            })
            .collect();

        debug!(
            regions = regions.len(),
            discarded,
            min_area = self.min_area,
            "Extracted motion regions"
        );

        regions
    }
}

/// Bounding box and enclosed area of a closed boundary
fn bounding_region(points: &[Point<i32>]) -> Option<Region> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(Region {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
        area: polygon_area(points),
    })
}

/// Shoelace area of the polygon through the boundary pixel centers
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();

    twice.abs() as f64 / 2.0
}
