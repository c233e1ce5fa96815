// rdepth-camera/src/lib.rs
// ============================================================
// Frame types + capture contract for the rdepth preview
// A capture source pushes synchronized (color, depth, face)
// triples to a caller-supplied handler on its own thread.
// ------------------------------------------------------------
// Public API:
//   * SyncedFrame / ColorImage / DepthMap – per-frame data
//   * CaptureSource – start/stop/reconfigure + handler install
//   * SyntheticCapture – in-process source for demos & tests
//   * frame_stream() – async stream adapter over any source
// ============================================================

//! rdepth – capture layer
//!
//! This crate defines the frame triple delivered once per camera tick
//! ([`SyncedFrame`]) and the [`CaptureSource`] contract a device backend
//! must satisfy: install a frame handler, then `start`, and the source
//! invokes the handler on an internal thread at its own cadence.  The
//! tick rate is the source's business; consumers must not assume it is
//! bounded or fixed.
//!
//! No real sensor backend lives here.  [`SyntheticCapture`] generates
//! plausible color+depth frames on a paced thread so the rest of the
//! pipeline can run anywhere.

use ndarray::Array2;
use std::time::Duration;
use thiserror::Error;

mod stream;
mod synthetic;

pub use stream::{frame_stream, FrameStream};
pub use synthetic::SyntheticCapture;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("pixel buffer length {got} does not match {width}x{height} RGB8")]
    BadPixelBuffer { width: u32, height: u32, got: usize },
    #[error("capture source is already running")]
    AlreadyRunning,
    #[error("capture source failed to start: {0}")]
    Start(String),
}

pub type Result<T> = std::result::Result<T, CaptureError>;

/// Which representation a [`DepthMap`]'s values use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthKind {
    /// Distance from the sensor, meters.
    Depth,
    /// Inverse distance, 1/meters.
    Disparity,
}

/// Per-pixel depth (or disparity) map, same timing domain as the
/// color image it arrived with.
#[derive(Debug, Clone)]
pub struct DepthMap {
    pub values: Array2<f32>,
    pub kind: DepthKind,
}

impl DepthMap {
    pub fn new(values: Array2<f32>, kind: DepthKind) -> Self {
        Self { values, kind }
    }

    /// (width, height) of the map.
    pub fn dimensions(&self) -> (u32, u32) {
        let (h, w) = self.values.dim();
        (w as u32, h as u32)
    }
}

/// Packed RGB8 color image.
#[derive(Debug, Clone)]
pub struct ColorImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ColorImage {
    /// Wrap an RGB8 buffer, checking the length against the dimensions.
    pub fn from_rgb8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != (width as usize) * (height as usize) * 3 {
            return Err(CaptureError::BadPixelBuffer {
                width,
                height,
                got: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }
}

/// Face rectangle in normalized [0,1] image coordinates.
///
/// Delivered alongside a frame when the source detects one.  The
/// preview path carries it through but does not consume it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The frame triple: one camera tick's worth of synchronized data.
///
/// Not retained by the source once the handler returns; handlers move
/// out whatever they need.
#[derive(Debug, Clone)]
pub struct SyncedFrame {
    pub color: ColorImage,
    pub depth: Option<DepthMap>,
    pub face: Option<FaceBox>,
    pub pts: Duration,
}

/// Logical camera identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraFacing {
    Back,
    Front,
}

impl CameraFacing {
    /// The other identity, for switch-camera actions.
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Back => CameraFacing::Front,
            CameraFacing::Front => CameraFacing::Back,
        }
    }
}

/// Handler invoked once per tick on the source's delivery thread.
pub type FrameHandler = Box<dyn FnMut(SyncedFrame) + Send>;

/// Contract for a synchronized video+depth capture backend.
///
/// `change_camera` reconfigures under the new identity and resumes
/// delivering frames if the source was running.  `set_depth_filter_enabled`
/// controls the source's own temporal smoothing, not anything downstream.
pub trait CaptureSource: Send {
    /// Install (or clear, with `None`) the per-frame handler.
    fn set_frame_handler(&mut self, handler: Option<FrameHandler>);

    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    fn change_camera(&mut self, facing: CameraFacing) -> Result<()>;

    fn set_depth_filter_enabled(&mut self, enabled: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_image_rejects_short_buffer() {
        let err = ColorImage::from_rgb8(4, 4, vec![0u8; 10]).unwrap_err();
        assert!(matches!(err, CaptureError::BadPixelBuffer { got: 10, .. }));
    }

    #[test]
    fn color_image_accepts_exact_buffer() {
        let img = ColorImage::from_rgb8(4, 2, vec![7u8; 24]).unwrap();
        assert_eq!((img.width, img.height), (4, 2));
    }

    #[test]
    fn facing_flips_both_ways() {
        assert_eq!(CameraFacing::Back.flipped(), CameraFacing::Front);
        assert_eq!(CameraFacing::Front.flipped(), CameraFacing::Back);
    }

    #[test]
    fn depth_map_dimensions_are_width_height() {
        let map = DepthMap::new(Array2::zeros((3, 5)), DepthKind::Depth);
        assert_eq!(map.dimensions(), (5, 3));
    }
}
