mod image_sequence;
mod preview;
mod v4l_capture;

pub use image_sequence::ImageSequenceSource;
pub use preview::PreviewPump;
pub use v4l_capture::{CameraSelection, WebcamCapture};

use crate::error::CaptureError;
use image::RgbImage;

/// Native size reported when a preview starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewProperties {
    pub width: u32,
    pub height: u32,
}

impl PreviewProperties {
    /// Size of the decode buffer for a given preview width, keeping the
    /// native aspect ratio
    pub fn scaled_to_width(&self, width: u32) -> (u32, u32) {
        let width = width.max(1);
        if self.width == 0 {
            return (width, width);
        }
        let height = (width as f64 / self.width as f64) * self.height as f64;
        (width, (height as u32).max(1))
    }
}

/// Trait for camera preview sources
pub trait FrameSource {
    /// Start the preview and report its native resolution
    fn start_preview(&mut self) -> Result<PreviewProperties, CaptureError>;

    /// Stop the preview; calling it on a stopped source is a no-op
    fn stop_preview(&mut self) -> Result<(), CaptureError>;

    /// Block until the next frame is available
    fn capture_frame(&mut self) -> Result<RgbImage, CaptureError>;
}
