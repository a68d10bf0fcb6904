use thiserror::Error;

/// Failures while opening or reading a frame source
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No capture device is attached, or none matched the requested name
    #[error("no camera available")]
    NoCamera,

    /// The device was found but the preview could not be started
    #[error("failed to start preview: {0}")]
    PreviewStart(String),

    /// A single frame could not be captured or converted
    #[error("failed to capture frame: {0}")]
    Frame(String),
}

/// Failures of a single decode attempt
///
/// A decode that simply finds no symbol is not an error; it is `Ok(None)`.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("pixel buffer of {len} bytes does not fit {width}x{height}")]
    BufferSize { len: usize, width: u32, height: u32 },

    #[error("decode worker failed: {0}")]
    Worker(String),
}

/// Errors surfaced by the scanner view
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("scanner is not initialized")]
    NotInitialized,
}
