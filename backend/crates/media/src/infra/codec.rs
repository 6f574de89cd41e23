//! Codec Strategies
//!
//! - [`RasterCodec`]: decode, shrink into the kind's bounding box and
//!   re-encode as JPEG with the bounded re-compression loop
//! - [`PassThroughCodec`]: no pixel work; stores small inputs unchanged

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageReader};

use crate::application::config::{CodecKind, MediaConfig};
use crate::domain::codec::ImageCodec;
use crate::domain::entities::EncodedImage;
use crate::domain::services::{CompressionPolicy, compress_with, fit_within};
use crate::domain::value_objects::{ImageFormat, UploadKind};
use crate::error::{MediaError, MediaResult};

/// Build the codec selected in `config`.
pub fn codec_for(config: &MediaConfig) -> Arc<dyn ImageCodec> {
    match config.codec {
        CodecKind::Raster => Arc::new(RasterCodec::new(config.compression)),
        CodecKind::PassThrough => Arc::new(PassThroughCodec::new(config.passthrough_max_bytes)),
    }
}

#[derive(Debug, Clone, Default)]
pub struct RasterCodec {
    policy: CompressionPolicy,
}

impl RasterCodec {
    pub fn new(policy: CompressionPolicy) -> Self {
        Self { policy }
    }

    fn decode(input: &[u8], format: ImageFormat) -> MediaResult<DynamicImage> {
        Ok(ImageReader::with_format(Cursor::new(input), format.to_image_format()).decode()?)
    }

    fn shrink(img: DynamicImage, kind: UploadKind) -> DynamicImage {
        let (max_w, max_h) = kind.max_dimensions();
        let (w, h) = fit_within(img.width(), img.height(), max_w, max_h);
        if (w, h) == img.dimensions() {
            img
        } else {
            img.thumbnail_exact(w, h)
        }
    }
}

impl ImageCodec for RasterCodec {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn normalize(
        &self,
        input: &[u8],
        format: ImageFormat,
        kind: UploadKind,
    ) -> MediaResult<EncodedImage> {
        let img = Self::shrink(Self::decode(input, format)?, kind);
        // JPEG has no alpha channel
        let rgb = img.to_rgb8();

        let compressed = compress_with(&self.policy, kind.initial_quality(input.len()), |quality| {
            let mut out = Vec::new();
            JpegEncoder::new_with_quality(&mut out, quality).encode_image(&rgb)?;
            Ok::<_, MediaError>(out)
        })?;

        tracing::debug!(
            kind = %kind,
            width = rgb.width(),
            height = rgb.height(),
            quality = compressed.quality,
            attempts = compressed.attempts,
            bytes = compressed.bytes.len(),
            "Encoded JPEG"
        );

        Ok(EncodedImage {
            bytes: compressed.bytes,
            format: ImageFormat::Jpeg,
            dimensions: Some(rgb.dimensions()),
            quality: Some(compressed.quality),
            attempts: compressed.attempts,
        })
    }
}

/// Stores uploads without decoding; only inputs that already fit are accepted.
#[derive(Debug, Clone)]
pub struct PassThroughCodec {
    max_bytes: usize,
}

impl PassThroughCodec {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl ImageCodec for PassThroughCodec {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn normalize(
        &self,
        input: &[u8],
        format: ImageFormat,
        _kind: UploadKind,
    ) -> MediaResult<EncodedImage> {
        if input.len() > self.max_bytes {
            return Err(MediaError::ImageTooLarge {
                actual: input.len(),
                limit: self.max_bytes,
            });
        }
        Ok(EncodedImage {
            bytes: input.to_vec(),
            format,
            dimensions: None,
            quality: None,
            attempts: 0,
        })
    }
}
