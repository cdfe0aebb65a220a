//! Image decoding.

use image::DynamicImage;

use crate::core::error::DecodeError;

/// Converts raw bytes into a decoded image
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError>;
}

/// Decoder backed by the `image` crate; the format is sniffed from the bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl Decoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::new("empty input"));
        }

        image::load_from_memory(bytes).map_err(|e| DecodeError::new(e.to_string()))
    }
}
