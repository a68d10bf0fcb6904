mod buffer;
mod qr;
mod types;

pub use buffer::PixelBuffer;
pub use qr::{DecodeOptions, RqrrDecoder};
pub use types::{BarcodeDecoder, DecodeResult};

/// Create the default QR decoder
pub fn create_default_decoder(options: DecodeOptions) -> RqrrDecoder {
    RqrrDecoder::new(options)
}
