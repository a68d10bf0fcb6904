use super::{BarcodeDecoder, DecodeResult, PixelBuffer};
use crate::error::DecodeError;
use rqrr::PreparedImage;

/// Decoder options
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Retry on the inverted image when the first pass finds nothing
    pub try_harder: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { try_harder: true }
    }
}

/// QR decoder backed by `rqrr`
///
/// rqrr locates grids in any orientation, so no rotation pass is needed.
#[derive(Debug, Clone, Default)]
pub struct RqrrDecoder {
    options: DecodeOptions,
}

impl RqrrDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    fn scan(luma: &[u8], width: usize, height: usize, invert: bool) -> Option<String> {
        let mut prepared = PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            let value = luma[y * width + x];
            if invert {
                255 - value
            } else {
                value
            }
        });

        let grids = prepared.detect_grids();
        tracing::trace!(count = grids.len(), invert, "Detected grids");

        for grid in grids {
            match grid.decode() {
                Ok((_meta, content)) if !content.is_empty() => return Some(content),
                Ok(_) => {}
                Err(e) => tracing::debug!(error = %e, "Failed to decode grid"),
            }
        }

        None
    }
}

impl BarcodeDecoder for RqrrDecoder {
    fn decode(&self, buffer: &PixelBuffer) -> Result<Option<DecodeResult>, DecodeError> {
        let _span = tracing::debug_span!("rqrr_decode").entered();

        let luma = buffer.to_luma()?;
        let (width, height) = (buffer.width() as usize, buffer.height() as usize);

        let found = Self::scan(&luma, width, height, false).or_else(|| {
            if self.options.try_harder {
                Self::scan(&luma, width, height, true)
            } else {
                None
            }
        });

        Ok(found.map(DecodeResult::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_frame_decodes_to_nothing() {
        let decoder = RqrrDecoder::default();
        let buffer = PixelBuffer::from_raw(vec![255; 64 * 64 * 3], 64, 64);

        assert_eq!(decoder.decode(&buffer).unwrap(), None);
    }

    #[test]
    fn test_blank_frame_without_try_harder() {
        let decoder = RqrrDecoder::new(DecodeOptions { try_harder: false });
        let buffer = PixelBuffer::new(32, 24);

        assert_eq!(decoder.decode(&buffer).unwrap(), None);
    }

    #[test]
    fn test_malformed_buffer_is_an_error() {
        let decoder = RqrrDecoder::default();
        let buffer = PixelBuffer::from_raw(vec![0; 10], 2, 2);

        assert!(matches!(
            decoder.decode(&buffer),
            Err(DecodeError::BufferSize { len: 10, .. })
        ));
    }
}
