//! Domain Services - pure sizing and compression logic
//!
//! Nothing here touches pixels; the codec supplies an `encode(quality)`
//! closure and these functions decide how many times to call it.

/// Re-compression rules applied after the first encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPolicy {
    /// Output size the loop tries to get under
    pub target_bytes: usize,
    /// Re-encodes allowed after the first one
    pub max_attempts: u32,
    /// Quality never goes below this
    pub min_quality: u8,
    /// Quality drop per attempt
    pub quality_step: u8,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            target_bytes: 40_000,
            max_attempts: 3,
            min_quality: 30,
            quality_step: 10,
        }
    }
}

/// Outcome of [`compress_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub quality: u8,
    /// Re-encodes performed after the initial one
    pub attempts: u32,
}

/// Encode at `initial_quality`, then lower the quality and re-encode while
/// the output is above the target, attempts remain and the quality can
/// still drop.
///
/// The result may still be above the target; the caller's final size gate
/// decides whether that is acceptable.
pub fn compress_with<E, F>(
    policy: &CompressionPolicy,
    initial_quality: u8,
    mut encode: F,
) -> Result<Compressed, E>
where
    F: FnMut(u8) -> Result<Vec<u8>, E>,
{
    let mut quality = initial_quality.clamp(1, 100);
    let mut bytes = encode(quality)?;
    let mut attempts = 0;

    while bytes.len() > policy.target_bytes
        && attempts < policy.max_attempts
        && quality > policy.min_quality
    {
        quality = quality
            .saturating_sub(policy.quality_step)
            .max(policy.min_quality);
        bytes = encode(quality)?;
        attempts += 1;
        tracing::debug!(attempt = attempts, quality, bytes = bytes.len(), "Re-compressed image");
    }

    Ok(Compressed {
        bytes,
        quality,
        attempts,
    })
}

/// Scale `(width, height)` to fit inside `(max_w, max_h)` keeping the aspect
/// ratio. Images already inside the box are returned unchanged.
pub fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width <= max_w && height <= max_h {
        return (width, height);
    }
    let ratio = f64::min(
        f64::from(max_w) / f64::from(width),
        f64::from(max_h) / f64::from(height),
    );
    let w = (f64::from(width) * ratio).round() as u32;
    let h = (f64::from(height) * ratio).round() as u32;
    (w.clamp(1, max_w), h.clamp(1, max_h))
}
