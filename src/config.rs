use crate::capture::CameraSelection;
use crate::decoder::DecodeOptions;
use std::path::PathBuf;

pub const DEFAULT_PREVIEW_WIDTH: u32 = 640;
pub const DEFAULT_REPLAY_FPS: u32 = 30;
pub const DEFAULT_TITLE: &str = "QRReader";

/// Log the frame rate and decode counters every this many frames
pub const STATS_INTERVAL: u64 = 30;

/// Runtime settings assembled from the command line
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub camera: CameraSelection,
    /// Replay these images instead of opening a camera
    pub images: Vec<PathBuf>,
    /// Width of the decode buffer; height follows the preview aspect ratio
    pub preview_width: u32,
    pub replay_fps: u32,
    pub stop_after_first: bool,
    pub decode: DecodeOptions,
    /// Dialog title for decoded messages
    pub title: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            camera: CameraSelection::default(),
            images: Vec::new(),
            preview_width: DEFAULT_PREVIEW_WIDTH,
            replay_fps: DEFAULT_REPLAY_FPS,
            stop_after_first: false,
            decode: DecodeOptions::default(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl ScannerConfig {
    pub fn uses_camera(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScannerConfig::default();
        assert_eq!(config.preview_width, 640);
        assert_eq!(config.title, "QRReader");
        assert!(config.decode.try_harder);
        assert!(!config.stop_after_first);
        assert!(config.uses_camera());
    }
}
