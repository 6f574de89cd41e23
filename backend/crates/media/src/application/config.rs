//! Application Configuration

use std::fmt;
use std::str::FromStr;

use platform::rate_limit::{RateLimitConfig, RateLimitPolicy};

use crate::domain::services::CompressionPolicy;

/// Which [`crate::domain::codec::ImageCodec`] the process runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecKind {
    /// Decode, resize and re-encode as JPEG
    #[default]
    Raster,
    /// Store the upload as-is, small inputs only
    PassThrough,
}

impl CodecKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CodecKind::Raster => "raster",
            CodecKind::PassThrough => "passthrough",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown media codec {0:?}, expected \"raster\" or \"passthrough\"")]
pub struct UnknownCodec(pub String);

impl FromStr for CodecKind {
    type Err = UnknownCodec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raster" => Ok(CodecKind::Raster),
            "passthrough" | "pass-through" => Ok(CodecKind::PassThrough),
            _ => Err(UnknownCodec(s.to_string())),
        }
    }
}

/// Raw payload ceiling checked before decoding
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Upload pipeline configuration
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Raw payloads above this are rejected before decoding
    pub max_upload_bytes: usize,
    /// Ceiling on the stored `data:` URL, in characters
    pub max_data_url_len: usize,
    /// Largest raw input the pass-through codec accepts
    pub passthrough_max_bytes: usize,
    /// Re-compression loop settings for the raster codec
    pub compression: CompressionPolicy,
    /// Per-user upload admission
    pub rate_limit: RateLimitConfig,
    pub codec: CodecKind,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_data_url_len: 60_000,
            passthrough_max_bytes: 1_000_000,
            compression: CompressionPolicy::default(),
            rate_limit: RateLimitPolicy::Upload.default_config(),
            codec: CodecKind::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_kind_parsing() {
        assert_eq!("raster".parse::<CodecKind>().unwrap(), CodecKind::Raster);
        assert_eq!(" PassThrough ".parse::<CodecKind>().unwrap(), CodecKind::PassThrough);
        assert!("sharp".parse::<CodecKind>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = MediaConfig::default();
        assert_eq!(config.max_data_url_len, 60_000);
        assert_eq!(config.max_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.passthrough_max_bytes, 1_000_000);
        assert_eq!(config.rate_limit, RateLimitConfig::new(5, 60));
        assert_eq!(config.codec, CodecKind::Raster);
    }
}
