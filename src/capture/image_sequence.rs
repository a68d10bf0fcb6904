use super::{FrameSource, PreviewProperties};
use crate::error::CaptureError;
use image::RgbImage;
use std::path::Path;
use std::time::{Duration, Instant};

/// Replays still images as a looping preview stream
pub struct ImageSequenceSource {
    frames: Vec<RgbImage>,
    interval: Duration,
    cursor: usize,
    last_frame: Option<Instant>,
    running: bool,
}

impl ImageSequenceSource {
    /// Load every image up front so capture never touches the disk
    pub fn open<P: AsRef<Path>>(paths: &[P], fps: u32) -> Result<Self, CaptureError> {
        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let frame = image::open(path)
                .map_err(|e| {
                    CaptureError::PreviewStart(format!("failed to load {}: {e}", path.display()))
                })?
                .to_rgb8();
            tracing::debug!("Loaded {} ({}x{})", path.display(), frame.width(), frame.height());
            frames.push(frame);
        }

        Self::from_frames(frames, fps)
    }

    pub fn from_frames(frames: Vec<RgbImage>, fps: u32) -> Result<Self, CaptureError> {
        if frames.is_empty() {
            return Err(CaptureError::NoCamera);
        }

        let interval = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f32(1.0 / fps as f32)
        };

        Ok(Self {
            frames,
            interval,
            cursor: 0,
            last_frame: None,
            running: false,
        })
    }
}

impl FrameSource for ImageSequenceSource {
    fn start_preview(&mut self) -> Result<PreviewProperties, CaptureError> {
        let (width, height) = self.frames[0].dimensions();
        self.running = true;
        self.cursor = 0;
        self.last_frame = None;

        tracing::info!(
            "Replaying {} image(s) at {}x{}",
            self.frames.len(),
            width,
            height
        );

        Ok(PreviewProperties { width, height })
    }

    fn stop_preview(&mut self) -> Result<(), CaptureError> {
        self.running = false;
        Ok(())
    }

    fn capture_frame(&mut self) -> Result<RgbImage, CaptureError> {
        if !self.running {
            return Err(CaptureError::Frame("preview is not running".to_string()));
        }

        // Frame rate limiting
        if let Some(last) = self.last_frame {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                std::thread::sleep(self.interval - elapsed);
            }
        }
        self.last_frame = Some(Instant::now());

        let frame = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(frame)
    }
}
