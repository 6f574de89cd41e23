//! Domain Entities

use platform::encoding::data_url;

use crate::domain::value_objects::{ImageFormat, UploadKind};

/// Codec output, before it is turned into a data URL
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    /// Pixel size after resizing; unknown when the codec does not decode
    pub dimensions: Option<(u32, u32)>,
    /// JPEG quality of the final encode, if the codec re-encoded
    pub quality: Option<u8>,
    /// Re-encodes after the first one
    pub attempts: u32,
}

/// An upload that passed every gate and is ready to be stored
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub kind: UploadKind,
    pub data_url: String,
    pub original_bytes: usize,
    pub encoded_bytes: usize,
    pub quality: Option<u8>,
}

impl NormalizedImage {
    pub fn new(kind: UploadKind, original_bytes: usize, encoded: &EncodedImage) -> Self {
        Self {
            kind,
            data_url: data_url(encoded.format.mime(), &encoded.bytes),
            original_bytes,
            encoded_bytes: encoded.bytes.len(),
            quality: encoded.quality,
        }
    }
}
