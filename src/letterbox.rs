//! Letterbox transform
//!
//! Images are shrunk to fit a square canvas without changing their aspect
//! ratio and anchored at the top-left corner. The remaining area is white.
//! Box remapping relies on this anchor: [`LetterboxGeometry::pad_x`] and
//! [`LetterboxGeometry::pad_y`] are always the placement offsets used by
//! [`render_image`].

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};

use crate::config::validate_target_size_value;
use crate::error::{ExportError, ExportResult};

pub const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Placement of a resized image on the square canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxGeometry {
    /// Uniform scale factor, never above 1
    pub scale: f64,
    pub resized_width: u32,
    pub resized_height: u32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub target_size: u32,
}

impl LetterboxGeometry {
    pub fn compute(orig_width: u32, orig_height: u32, target_size: u32) -> ExportResult<Self> {
        validate_target_size_value(target_size)?;
        if orig_width == 0 || orig_height == 0 {
            return Err(ExportError::InvalidImageDimensions {
                width: orig_width,
                height: orig_height,
            });
        }

        let target = target_size as f64;
        let (w, h) = (orig_width as f64, orig_height as f64);
        let scale = (target / w).min(target / h).min(1.0);

        let resized_width = ((w * scale).round() as u32).clamp(1, target_size);
        let resized_height = ((h * scale).round() as u32).clamp(1, target_size);

        Ok(Self {
            scale,
            resized_width,
            resized_height,
            pad_x: 0,
            pad_y: 0,
            target_size,
        })
    }

    /// Effective per-axis scale once the resized size is rounded to whole pixels
    pub fn axis_scales(&self, orig_width: u32, orig_height: u32) -> (f64, f64) {
        (
            self.resized_width as f64 / orig_width as f64,
            self.resized_height as f64 / orig_height as f64,
        )
    }

    pub fn is_identity_resize(&self, orig_width: u32, orig_height: u32) -> bool {
        self.resized_width == orig_width && self.resized_height == orig_height
    }
}

/// Render `image` onto a white `target_size` square canvas.
///
/// Any color mode is converted to 8-bit RGB first; alpha is discarded.
pub fn render_image(image: &DynamicImage, geometry: &LetterboxGeometry) -> RgbImage {
    let rgb = image.to_rgb8();
    let resized = if geometry.is_identity_resize(rgb.width(), rgb.height()) {
        rgb
    } else {
        imageops::resize(
            &rgb,
            geometry.resized_width,
            geometry.resized_height,
            FilterType::Lanczos3,
        )
    };

    let mut canvas = RgbImage::from_pixel(geometry.target_size, geometry.target_size, BACKGROUND);
    imageops::replace(
        &mut canvas,
        &resized,
        i64::from(geometry.pad_x),
        i64::from(geometry.pad_y),
    );
    canvas
}
