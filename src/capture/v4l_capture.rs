use super::{FrameSource, PreviewProperties};
use crate::error::CaptureError;
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraIndex, ControlValueSetter, KnownCameraControl, RequestedFormat,
    RequestedFormatType,
};
use nokhwa::Camera;

// V4L2 camera class controls (linux/v4l2-controls.h)
const V4L2_CID_EXPOSURE_AUTO: u128 = 0x009a_0901;
const V4L2_CID_FOCUS_AUTO: u128 = 0x009a_090c;
/// Auto exposure time with manual iris, the automatic mode UVC devices accept
const V4L2_EXPOSURE_APERTURE_PRIORITY: i64 = 3;

/// Controls switched to automatic once the stream is open
fn auto_controls() -> [(&'static str, KnownCameraControl, ControlValueSetter); 2] {
    [
        (
            "focus",
            KnownCameraControl::Other(V4L2_CID_FOCUS_AUTO),
            ControlValueSetter::Boolean(true),
        ),
        (
            "exposure",
            KnownCameraControl::Other(V4L2_CID_EXPOSURE_AUTO),
            ControlValueSetter::Integer(V4L2_EXPOSURE_APERTURE_PRIORITY),
        ),
    ]
}

/// Which capture device to open
#[derive(Debug, Clone, Default)]
pub struct CameraSelection {
    /// Device index used when no name is given
    pub index: u32,
    /// Case-insensitive fragment of the device name, e.g. "back"
    pub name: Option<String>,
}

impl CameraSelection {
    /// Pick a device from the enumerated names.
    ///
    /// Returns the position of the chosen device in `names`, or `None` when
    /// the configured index should be used as-is.
    pub fn pick(&self, names: &[String]) -> Result<Option<usize>, CaptureError> {
        if names.is_empty() {
            return Err(CaptureError::NoCamera);
        }

        let Some(fragment) = &self.name else {
            return Ok(None);
        };

        let fragment = fragment.to_lowercase();
        names
            .iter()
            .position(|name| name.to_lowercase().contains(&fragment))
            .map(Some)
            .ok_or(CaptureError::NoCamera)
    }
}

pub struct WebcamCapture {
    camera: Camera,
    streaming: bool,
}

impl WebcamCapture {
    pub fn new(selection: &CameraSelection) -> Result<Self, CaptureError> {
        let devices = nokhwa::query(ApiBackend::Auto)
            .map_err(|e| CaptureError::PreviewStart(format!("device query failed: {e}")))?;

        let names: Vec<String> = devices.iter().map(|d| d.human_name()).collect();
        tracing::debug!("Found {} capture device(s): {:?}", names.len(), names);

        let index = match selection.pick(&names)? {
            Some(pos) => devices[pos].index().clone(),
            None => CameraIndex::Index(selection.index),
        };

        tracing::info!("Initializing webcam {:?}", index);

        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);

        let camera = Camera::new(index, requested)
            .map_err(|e| CaptureError::PreviewStart(format!("failed to open camera: {e}")))?;

        Ok(Self {
            camera,
            streaming: false,
        })
    }
}

impl FrameSource for WebcamCapture {
    fn start_preview(&mut self) -> Result<PreviewProperties, CaptureError> {
        self.camera
            .open_stream()
            .map_err(|e| CaptureError::PreviewStart(format!("failed to open stream: {e}")))?;
        self.streaming = true;

        // Best effort: many devices lack one or both controls
        for (label, control, value) in auto_controls() {
            match self.camera.set_camera_control(control, value) {
                Ok(()) => tracing::debug!("Auto {} enabled", label),
                Err(e) => tracing::warn!("Auto {} unavailable: {}", label, e),
            }
        }

        let resolution = self.camera.resolution();
        tracing::info!(
            "Webcam preview started at {}x{}",
            resolution.width(),
            resolution.height()
        );

        Ok(PreviewProperties {
            width: resolution.width(),
            height: resolution.height(),
        })
    }

    fn stop_preview(&mut self) -> Result<(), CaptureError> {
        if !self.streaming {
            return Ok(());
        }
        self.streaming = false;
        self.camera
            .stop_stream()
            .map_err(|e| CaptureError::Frame(format!("failed to stop stream: {e}")))
    }

    fn capture_frame(&mut self) -> Result<RgbImage, CaptureError> {
        let frame = self
            .camera
            .frame()
            .map_err(|e| CaptureError::Frame(e.to_string()))?;

        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::Frame(format!("failed to decode frame: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_auto_controls_enable_focus_and_exposure() {
        let controls = auto_controls();

        assert_eq!(controls[0].0, "focus");
        assert!(matches!(controls[0].1, KnownCameraControl::Other(0x009a090c)));
        assert!(matches!(controls[0].2, ControlValueSetter::Boolean(true)));

        assert_eq!(controls[1].0, "exposure");
        assert!(matches!(controls[1].1, KnownCameraControl::Other(0x009a0901)));
        assert!(matches!(controls[1].2, ControlValueSetter::Integer(3)));
    }

    #[test]
    fn test_pick_without_devices() {
        let selection = CameraSelection::default();
        assert!(matches!(selection.pick(&[]), Err(CaptureError::NoCamera)));
    }

    #[test]
    fn test_pick_by_index() {
        let selection = CameraSelection {
            index: 1,
            name: None,
        };
        assert_eq!(selection.pick(&names(&["Front", "Back"])).unwrap(), None);
    }

    #[test]
    fn test_pick_by_name_fragment() {
        let selection = CameraSelection {
            index: 0,
            name: Some("back".to_string()),
        };
        let devices = names(&["Integrated Front Camera", "USB Back Camera"]);
        assert_eq!(selection.pick(&devices).unwrap(), Some(1));
    }

    #[test]
    fn test_pick_by_name_no_match() {
        let selection = CameraSelection {
            index: 0,
            name: Some("rear".to_string()),
        };
        assert!(matches!(
            selection.pick(&names(&["Front"])),
            Err(CaptureError::NoCamera)
        ));
    }
}
