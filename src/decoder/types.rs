use super::buffer::PixelBuffer;
use crate::error::DecodeError;

/// Text recovered from one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult {
    pub text: String,
}

impl DecodeResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Trait for barcode recognition backends
///
/// Implementations run on the blocking worker pool, so they must be
/// shareable across threads.
pub trait BarcodeDecoder: Send + Sync + 'static {
    /// Decode the first symbol found in the buffer
    ///
    /// # Returns
    /// * `Ok(Some(result))` when a symbol decoded to text
    /// * `Ok(None)` when nothing was found; the common case
    /// * `Err(_)` when the buffer itself could not be processed
    fn decode(&self, buffer: &PixelBuffer) -> Result<Option<DecodeResult>, DecodeError>;
}
