//! Value Objects

use std::fmt;
use std::str::FromStr;

use crate::error::MediaError;

/// Content types accepted on upload
pub const ALLOWED_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Which profile slot an upload targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Avatar,
    Banner,
}

impl UploadKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UploadKind::Avatar => "avatar",
            UploadKind::Banner => "banner",
        }
    }

    /// Bounding box the output must fit in: (width, height)
    pub const fn max_dimensions(&self) -> (u32, u32) {
        match self {
            UploadKind::Avatar => (200, 200),
            UploadKind::Banner => (1200, 400),
        }
    }

    /// First JPEG quality to try, lowered for heavy inputs
    pub const fn initial_quality(&self, raw_len: usize) -> u8 {
        match (self, raw_len) {
            (UploadKind::Avatar, n) if n > 2_000_000 => 60,
            (UploadKind::Banner, n) if n > 2_000_000 => 55,
            (UploadKind::Avatar, n) if n > 1_000_000 => 65,
            (UploadKind::Banner, n) if n > 1_000_000 => 60,
            (UploadKind::Avatar, _) => 75,
            (UploadKind::Banner, _) => 70,
        }
    }

    /// Success message shown to the user
    pub const fn updated_message(&self) -> &'static str {
        match self {
            UploadKind::Avatar => "Avatar updated successfully",
            UploadKind::Banner => "Banner updated successfully",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadKind {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "avatar" => Ok(UploadKind::Avatar),
            "banner" => Ok(UploadKind::Banner),
            other => Err(MediaError::InvalidKind(other.to_string())),
        }
    }
}

/// Image container recognised from its leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    /// RIFF container; the decoder rejects non-WebP RIFF payloads
    WebP,
}

impl ImageFormat {
    const JPEG_MAGIC: &'static [u8] = &[0xFF, 0xD8, 0xFF];
    const PNG_MAGIC: &'static [u8] = &[0x89, 0x50, 0x4E, 0x47];
    const RIFF_MAGIC: &'static [u8] = &[0x52, 0x49, 0x46, 0x46];

    /// Detect the format from magic bytes; `None` when nothing matches.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(Self::JPEG_MAGIC) {
            Some(ImageFormat::Jpeg)
        } else if bytes.starts_with(Self::PNG_MAGIC) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(Self::RIFF_MAGIC) {
            Some(ImageFormat::WebP)
        } else {
            None
        }
    }

    pub const fn mime(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::WebP => "image/webp",
        }
    }

    pub(crate) fn to_image_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::WebP => image::ImageFormat::WebP,
        }
    }
}

/// Check the client-declared content type against the allow-list.
///
/// Parameters such as `; charset=` are ignored and matching is
/// case-insensitive.
pub fn validate_declared_type(content_type: &str) -> Result<(), MediaError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
        Ok(())
    } else {
        Err(MediaError::UnsupportedMediaType(content_type.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(
            ImageFormat::sniff(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            Some(ImageFormat::Png)
        );
        assert_eq!(ImageFormat::sniff(b"RIFF\0\0\0\0WEBP"), Some(ImageFormat::WebP));
        assert_eq!(ImageFormat::sniff(b"GIF89a"), None);
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8]), None);
        assert_eq!(ImageFormat::sniff(&[]), None);
    }

    #[test]
    fn test_declared_type_allow_list() {
        for ok in ["image/jpeg", "image/jpg", "image/png", "image/webp", "IMAGE/PNG"] {
            assert!(validate_declared_type(ok).is_ok(), "{ok} should be accepted");
        }
        assert!(validate_declared_type("image/png; charset=binary").is_ok());
        assert!(matches!(
            validate_declared_type("image/gif"),
            Err(MediaError::UnsupportedMediaType(_))
        ));
        assert!(validate_declared_type("").is_err());
    }

    #[test]
    fn test_upload_kind_parsing() {
        assert_eq!("avatar".parse::<UploadKind>().unwrap(), UploadKind::Avatar);
        assert_eq!(" banner ".parse::<UploadKind>().unwrap(), UploadKind::Banner);
        assert!(matches!(
            "cover".parse::<UploadKind>(),
            Err(MediaError::InvalidKind(k)) if k == "cover"
        ));
    }

    #[test]
    fn test_initial_quality_tiers() {
        assert_eq!(UploadKind::Avatar.initial_quality(500_000), 75);
        assert_eq!(UploadKind::Banner.initial_quality(500_000), 70);
        assert_eq!(UploadKind::Avatar.initial_quality(1_000_000), 75);
        assert_eq!(UploadKind::Avatar.initial_quality(1_500_000), 65);
        assert_eq!(UploadKind::Banner.initial_quality(1_500_000), 60);
        assert_eq!(UploadKind::Avatar.initial_quality(3_000_000), 60);
        assert_eq!(UploadKind::Banner.initial_quality(3_000_000), 55);
    }

    #[test]
    fn test_bounds() {
        assert_eq!(UploadKind::Avatar.max_dimensions(), (200, 200));
        assert_eq!(UploadKind::Banner.max_dimensions(), (1200, 400));
    }
}
