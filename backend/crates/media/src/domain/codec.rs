//! Codec Port
//!
//! The strategy that turns validated upload bytes into stored bytes. One
//! implementation is chosen at startup and injected into the use case.

use crate::domain::entities::EncodedImage;
use crate::domain::value_objects::{ImageFormat, UploadKind};
use crate::error::MediaResult;

/// Synchronous, CPU-bound image transformation.
///
/// Callers run it on the blocking thread pool.
pub trait ImageCodec: Send + Sync + 'static {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Transform `input`, whose leading bytes identified it as `format`,
    /// into the bytes stored for `kind`.
    fn normalize(
        &self,
        input: &[u8],
        format: ImageFormat,
        kind: UploadKind,
    ) -> MediaResult<EncodedImage>;
}
