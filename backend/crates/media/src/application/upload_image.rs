//! Upload Image Use Case

use std::sync::Arc;

use kernel::id::UserId;
use platform::rate_limit::RateLimitStore;

use crate::application::config::MediaConfig;
use crate::domain::codec::ImageCodec;
use crate::domain::entities::NormalizedImage;
use crate::domain::repository::ProfileImageRepository;
use crate::domain::value_objects::{ImageFormat, UploadKind, validate_declared_type};
use crate::error::{MediaError, MediaResult};

/// Input DTO for the upload use case
#[derive(Debug, Clone)]
pub struct UploadImageInput {
    pub user_id: UserId,
    pub kind: UploadKind,
    /// Content type declared by the client, not trusted on its own
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Output DTO for the upload use case
#[derive(Debug, Clone)]
pub struct UploadImageOutput {
    pub kind: UploadKind,
    pub data_url: String,
    pub message: &'static str,
}

/// Validate, normalize and store a profile image
pub struct UploadImageUseCase<R, L>
where
    R: ProfileImageRepository,
    L: RateLimitStore,
{
    repo: Arc<R>,
    limiter: Arc<L>,
    codec: Arc<dyn ImageCodec>,
    config: Arc<MediaConfig>,
}

impl<R, L> UploadImageUseCase<R, L>
where
    R: ProfileImageRepository,
    L: RateLimitStore,
{
    pub fn new(
        repo: Arc<R>,
        limiter: Arc<L>,
        codec: Arc<dyn ImageCodec>,
        config: Arc<MediaConfig>,
    ) -> Self {
        Self {
            repo,
            limiter,
            codec,
            config,
        }
    }

    /// Limiter key for a user's uploads
    pub fn rate_limit_key(user_id: &UserId) -> String {
        format!("upload-image_{user_id}")
    }

    /// Count one upload attempt against the user's window.
    ///
    /// Called before the request body is read.
    pub async fn admit(&self, user_id: &UserId) -> MediaResult<()> {
        let key = Self::rate_limit_key(user_id);
        let result = self
            .limiter
            .check_and_increment(&key, &self.config.rate_limit)
            .await
            .map_err(|e| MediaError::Internal(format!("rate limiter unavailable: {e}")))?;

        if !result.allowed {
            let retry_after_secs = result.retry_after_secs(self.limiter.now_ms()).max(1);
            return Err(MediaError::RateLimitExceeded { retry_after_secs });
        }
        Ok(())
    }

    pub async fn execute(&self, input: UploadImageInput) -> MediaResult<UploadImageOutput> {
        let UploadImageInput {
            user_id,
            kind,
            content_type,
            bytes,
        } = input;

        if bytes.is_empty() {
            return Err(MediaError::MissingFile);
        }
        validate_declared_type(&content_type)?;

        let format = ImageFormat::sniff(&bytes).ok_or(MediaError::InvalidImageContent)?;

        let original_bytes = bytes.len();
        if original_bytes > self.config.max_upload_bytes {
            return Err(MediaError::ImageTooLarge {
                actual: original_bytes,
                limit: self.config.max_upload_bytes,
            });
        }

        tracing::debug!(
            user_id = %user_id,
            kind = %kind,
            declared = %content_type,
            detected = format.mime(),
            bytes = original_bytes,
            codec = self.codec.name(),
            "Processing upload"
        );

        let codec = Arc::clone(&self.codec);
        let encoded =
            tokio::task::spawn_blocking(move || codec.normalize(&bytes, format, kind)).await??;

        let image = NormalizedImage::new(kind, original_bytes, &encoded);
        if image.data_url.len() > self.config.max_data_url_len {
            return Err(MediaError::ImageTooLarge {
                actual: image.data_url.len(),
                limit: self.config.max_data_url_len,
            });
        }

        if !self
            .repo
            .set_profile_image(user_id, kind, &image.data_url)
            .await?
        {
            return Err(MediaError::UserNotFound);
        }

        tracing::info!(
            user_id = %user_id,
            kind = %kind,
            original_bytes = image.original_bytes,
            encoded_bytes = image.encoded_bytes,
            quality = image.quality,
            data_url_len = image.data_url.len(),
            "Profile image updated"
        );

        Ok(UploadImageOutput {
            kind,
            data_url: image.data_url,
            message: kind.updated_message(),
        })
    }
}
