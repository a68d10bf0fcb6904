use crate::error::DecodeError;
use image::{imageops, RgbImage};

/// Coefficients for luma conversion: Y = (76*R + 150*G + 29*B) >> 8
const COEF_R: u32 = 76;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Pixel buffer handed to the barcode decoder
///
/// Always RGB24, three bytes per pixel. The decode loop owns exactly one of
/// these and overwrites it on every cycle through [`PixelBuffer::render`].
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Allocate a black RGB buffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize * 3],
            width,
            height,
        }
    }

    #[cfg(test)]
    pub fn from_raw(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    #[cfg(test)]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[cfg(test)]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Render a camera frame into this buffer, scaling it to the buffer size.
    ///
    /// The existing allocation is reused.
    pub fn render(&mut self, frame: &RgbImage) {
        let _span = tracing::debug_span!("render").entered();

        self.data.clear();
        if frame.dimensions() == (self.width, self.height) {
            self.data.extend_from_slice(frame.as_raw());
        } else {
            let resized = imageops::resize(
                frame,
                self.width,
                self.height,
                imageops::FilterType::Triangle,
            );
            self.data.extend_from_slice(resized.as_raw());
        }
    }

    /// Convert the buffer to 8-bit luma, one byte per pixel in row-major order
    pub fn to_luma(&self) -> Result<Vec<u8>, DecodeError> {
        let pixels = self.width as usize * self.height as usize;
        if pixels == 0 || self.data.len() != pixels * 3 {
            return Err(DecodeError::BufferSize {
                len: self.data.len(),
                width: self.width,
                height: self.height,
            });
        }

        Ok(self
            .data
            .chunks_exact(3)
            .map(|p| luma(p[0], p[1], p[2]))
            .collect())
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 8) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_luma_rejects_mismatched_length() {
        let short = PixelBuffer::from_raw(vec![0; 11], 2, 2);
        let rgba = PixelBuffer::from_raw(vec![0; 16], 2, 2);
        let empty = PixelBuffer::from_raw(Vec::new(), 0, 0);

        assert!(matches!(
            short.to_luma(),
            Err(DecodeError::BufferSize { len: 11, width: 2, height: 2 })
        ));
        assert!(rgba.to_luma().is_err());
        assert!(empty.to_luma().is_err());
    }

    #[test]
    fn test_to_luma_weights_channels() {
        let buffer = PixelBuffer::from_raw(vec![255, 0, 0, 0, 255, 0, 0, 0, 255], 3, 1);

        assert_eq!(buffer.to_luma().unwrap(), vec![75, 149, 28]);
    }

    #[test]
    fn test_to_luma_white_and_black() {
        let buffer = PixelBuffer::from_raw(vec![255, 255, 255, 0, 0, 0], 2, 1);
        // 76 + 150 + 29 = 255, so white maps to 254 after the shift
        assert_eq!(buffer.to_luma().unwrap(), vec![254, 0]);
    }

    #[test]
    fn test_render_scales_into_existing_buffer() {
        let mut buffer = PixelBuffer::new(2, 2);
        let frame = RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));

        buffer.render(&frame);

        assert_eq!(buffer.dimensions(), (2, 2));
        assert_eq!(buffer.data().len(), 12);
        assert_eq!(&buffer.data()[0..3], &[10, 20, 30]);
    }

    #[test]
    fn test_render_same_size_copies() {
        let mut buffer = PixelBuffer::new(2, 1);
        let frame = RgbImage::from_raw(2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap();

        buffer.render(&frame);

        assert_eq!(buffer.data(), &[1, 2, 3, 4, 5, 6]);
    }
}
