//! Media Error Types
//!
//! Upload-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    /// No `X-User-Id` on the request
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Too many uploads, try again in {retry_after_secs} seconds")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// Multipart body has no (or an empty) `file` part
    #[error("No file was provided")]
    MissingFile,

    /// `type` field is neither `avatar` nor `banner`
    #[error("Invalid upload type {0:?}, expected \"avatar\" or \"banner\"")]
    InvalidKind(String),

    /// Declared content type outside the allow-list
    #[error("Unsupported file type {0:?}, only JPEG, PNG and WebP are accepted")]
    UnsupportedMediaType(String),

    /// Leading bytes match no known image signature, or decoding failed
    #[error("The file is not a valid image")]
    InvalidImageContent,

    /// Raw input or final data URL above its ceiling
    #[error("Image is too large ({actual} > {limit}), try a smaller or lower-resolution image")]
    ImageTooLarge { actual: usize, limit: usize },

    /// Request body cut off by the body-size limit
    #[error("Upload exceeds the {limit} byte limit")]
    UploadTooLarge { limit: usize },

    #[error("User not found")]
    UserNotFound,

    #[error("Malformed upload: {0}")]
    Multipart(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MediaError::Unauthorized => ErrorKind::Unauthorized,
            MediaError::RateLimitExceeded { .. } => ErrorKind::TooManyRequests,
            MediaError::MissingFile
            | MediaError::InvalidKind(_)
            | MediaError::InvalidImageContent
            | MediaError::Multipart(_) => ErrorKind::BadRequest,
            MediaError::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            MediaError::ImageTooLarge { .. } | MediaError::UploadTooLarge { .. } => {
                ErrorKind::PayloadTooLarge
            }
            MediaError::UserNotFound => ErrorKind::NotFound,
            MediaError::Database(_) | MediaError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn log(&self) {
        match self {
            MediaError::Database(e) => {
                tracing::error!(error = %e, "Media database error");
            }
            MediaError::Internal(msg) => {
                tracing::error!(message = %msg, "Media internal error");
            }
            MediaError::RateLimitExceeded { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "Upload rate limit exceeded");
            }
            MediaError::InvalidImageContent => {
                tracing::warn!("Upload rejected: content is not an image");
            }
            _ => {
                tracing::debug!(error = %self, "Upload rejected");
            }
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        let kind = err.kind();
        let retry_after = match &err {
            MediaError::RateLimitExceeded { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let app = AppError::new(kind, err.to_string());
        match retry_after {
            Some(secs) => app.with_retry_after(secs),
            None => app,
        }
    }
}

impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

impl From<image::ImageError> for MediaError {
    fn from(err: image::ImageError) -> Self {
        // Input is always in memory, so read failures mean truncated content
        match err {
            image::ImageError::Decoding(_)
            | image::ImageError::Unsupported(_)
            | image::ImageError::Limits(_)
            | image::ImageError::IoError(_) => MediaError::InvalidImageContent,
            other => MediaError::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for MediaError {
    fn from(err: tokio::task::JoinError) -> Self {
        MediaError::Internal(format!("codec task failed: {err}"))
    }
}
