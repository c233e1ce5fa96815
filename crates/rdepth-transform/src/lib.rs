//! rdepth-transform – turn a raw depth map into a renderable image.
//!
//! The per-frame depth path is: optional depth→disparity conversion,
//! Lanczos resample to the current drawable size, min/max normalization
//! to gray8, optional histogram equalization.  PNG encoding for still
//! captures of both the gray depth image and the RGB color image lives
//! here too.

use image::{GrayImage, ImageOutputFormat, RgbImage};
use rdepth_camera::{ColorImage, DepthKind, DepthMap};
use resize::{Pixel, Type};
use rgb::FromSlice;
use std::io::Cursor;
use thiserror::Error;

// Depth readings below this are clamped before inversion so disparity
// values stay finite.
const MIN_DEPTH_METERS: f32 = 1e-4;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("depth map has no samples")]
    EmptyDepthMap,
    #[error("target size {0}x{1} has a zero dimension")]
    ZeroTargetSize(u32, u32),
    #[error("image has a zero dimension")]
    ZeroImage,
    #[error("pixel buffer does not match image dimensions")]
    BadPixelBuffer,
    #[error("resample failed: {0}")]
    Resize(#[from] resize::Error),
    #[error("still encode failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, TransformError>;

/// Gray8 image ready for GPU upload or still encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RenderImage {
    /// Encode as PNG, for handing to a still sink.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        if self.width == 0 || self.height == 0 {
            return Err(TransformError::ZeroImage);
        }
        let buf = GrayImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or(TransformError::BadPixelBuffer)?;
        let mut out = Vec::new();
        buf.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)?;
        Ok(out)
    }
}

/// Convert a depth map to its disparity representation.
///
/// Maps already tagged [`DepthKind::Disparity`] pass through unchanged.
/// Depth values are clamped to a small positive floor before inversion.
/// An empty map is the conversion-failure case; downstream treats it
/// the same as depth data being absent.
pub fn to_disparity(map: &DepthMap) -> Result<DepthMap> {
    if map.values.is_empty() {
        return Err(TransformError::EmptyDepthMap);
    }
    match map.kind {
        DepthKind::Disparity => Ok(map.clone()),
        DepthKind::Depth => {
            let values = map.values.mapv(|d| {
                if d.is_finite() {
                    1.0 / d.max(MIN_DEPTH_METERS)
                } else {
                    0.0
                }
            });
            Ok(DepthMap::new(values, DepthKind::Disparity))
        }
    }
}

/// Resample a depth map to the target size and normalize it to gray8.
///
/// Lanczos3 over the raw f32 samples (same mechanism as color-frame
/// resizing elsewhere in this family, gray plane instead of RGB), then
/// a min/max stretch so the full 0..=255 range is used.  No rotation.
/// A constant-valued map normalizes to mid-gray.
pub fn resample(map: &DepthMap, width: u32, height: u32) -> Result<RenderImage> {
    let (src_h, src_w) = map.values.dim();
    if src_w == 0 || src_h == 0 {
        return Err(TransformError::EmptyDepthMap);
    }
    if width == 0 || height == 0 {
        return Err(TransformError::ZeroTargetSize(width, height));
    }

    let flat;
    let src: &[f32] = match map.values.as_slice() {
        Some(s) => s,
        None => {
            flat = map.values.iter().copied().collect::<Vec<f32>>();
            &flat
        }
    };

    let mut dst = vec![0.0f32; (width as usize) * (height as usize)];
    let mut resizer = resize::new(
        src_w,
        src_h,
        width as usize,
        height as usize,
        Pixel::GrayF32,
        Type::Lanczos3,
    )?;
    resizer.resize(src.as_gray(), dst.as_gray_mut())?;

    Ok(RenderImage {
        width,
        height,
        pixels: normalize_to_gray8(&dst),
    })
}

/// Min/max stretch to u8; non-finite samples map to black.
fn normalize_to_gray8(samples: &[f32]) -> Vec<u8> {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in samples {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }

    let range = max - min;
    if !range.is_finite() || range < f32::EPSILON {
        // Constant (or all non-finite) map: flat mid-gray.
        return vec![128u8; samples.len()];
    }

    samples
        .iter()
        .map(|&v| {
            if v.is_finite() {
                (((v - min) / range) * 255.0).round() as u8
            } else {
                0
            }
        })
        .collect()
}

/// 256-bin CDF histogram equalization.
///
/// Constant images come back unchanged (the CDF collapses to a single
/// bin and the mapping degenerates to identity).
pub fn equalize(image: &RenderImage) -> RenderImage {
    let total = image.pixels.len() as u64;
    if total == 0 {
        return image.clone();
    }

    let mut hist = [0u64; 256];
    for &p in &image.pixels {
        hist[p as usize] += 1;
    }

    let mut cdf = [0u64; 256];
    let mut running = 0u64;
    for (bin, &count) in hist.iter().enumerate() {
        running += count;
        cdf[bin] = running;
    }
    let cdf_min = cdf
        .iter()
        .copied()
        .find(|&c| c > 0)
        .unwrap_or(0);

    if cdf_min == total {
        return image.clone();
    }

    let mut lut = [0u8; 256];
    let denom = (total - cdf_min) as f64;
    for bin in 0..256 {
        let num = cdf[bin].saturating_sub(cdf_min) as f64;
        lut[bin] = ((num / denom) * 255.0).round() as u8;
    }

    RenderImage {
        width: image.width,
        height: image.height,
        pixels: image.pixels.iter().map(|&p| lut[p as usize]).collect(),
    }
}

/// Encode a color frame as PNG, for handing to a still sink.
pub fn encode_color_png(color: &ColorImage) -> Result<Vec<u8>> {
    if color.width == 0 || color.height == 0 {
        return Err(TransformError::ZeroImage);
    }
    let buf = RgbImage::from_raw(color.width, color.height, color.pixels.clone())
        .ok_or(TransformError::BadPixelBuffer)?;
    let mut out = Vec::new();
    buf.write_to(&mut Cursor::new(&mut out), ImageOutputFormat::Png)?;
    Ok(out)
}
