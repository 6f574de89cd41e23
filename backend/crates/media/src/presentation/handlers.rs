//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use kernel::id::UserId;
use platform::rate_limit::RateLimitStore;

use crate::application::config::MediaConfig;
use crate::application::upload_image::{UploadImageInput, UploadImageUseCase};
use crate::domain::codec::ImageCodec;
use crate::domain::repository::ProfileImageRepository;
use crate::error::{MediaError, MediaResult};
use crate::presentation::dto::UploadResponse;

/// Header carrying the authenticated user, set by the auth gateway
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared state for media handlers
pub struct MediaAppState<R, L> {
    pub repo: Arc<R>,
    pub limiter: Arc<L>,
    pub codec: Arc<dyn ImageCodec>,
    pub config: Arc<MediaConfig>,
}

impl<R, L> Clone for MediaAppState<R, L> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            limiter: Arc::clone(&self.limiter),
            codec: Arc::clone(&self.codec),
            config: Arc::clone(&self.config),
        }
    }
}

/// POST /api/user/upload-image
///
/// Multipart fields: `file` (the image) and `type` (`avatar` | `banner`).
pub async fn upload_image<R, L>(
    State(state): State<MediaAppState<R, L>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> MediaResult<Json<UploadResponse>>
where
    R: ProfileImageRepository + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let user_id = extract_user_id(&headers)?;

    let use_case = UploadImageUseCase::new(
        state.repo.clone(),
        state.limiter.clone(),
        state.codec.clone(),
        state.config.clone(),
    );

    // Admission before the body is read
    use_case.admit(&user_id).await?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut kind: Option<String> = None;
    let limit = state.config.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => file = Some(read_file(field, limit).await?),
            Some("type") => {
                kind = Some(field.text().await.map_err(|e| multipart_error(e, limit))?);
            }
            _ => {}
        }
    }

    let (content_type, bytes) = file.ok_or(MediaError::MissingFile)?;
    let kind = kind.unwrap_or_default().parse()?;

    let output = use_case
        .execute(UploadImageInput {
            user_id,
            kind,
            content_type,
            bytes,
        })
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        url: output.data_url,
        message: output.message.to_string(),
    }))
}

fn extract_user_id(headers: &HeaderMap) -> MediaResult<UserId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or(MediaError::Unauthorized)
}

async fn read_file(field: Field<'_>, limit: usize) -> MediaResult<(String, Vec<u8>)> {
    let content_type = field.content_type().unwrap_or_default().to_string();
    let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
    Ok((content_type, bytes.to_vec()))
}

fn multipart_error(err: MultipartError, limit: usize) -> MediaError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        MediaError::UploadTooLarge { limit }
    } else {
        MediaError::Multipart(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_user_id() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            extract_user_id(&headers),
            Err(MediaError::Unauthorized)
        ));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(extract_user_id(&headers).is_err());

        headers.insert(
            USER_ID_HEADER,
            HeaderValue::from_static("6f1c1f8e-7a5b-4a7e-9a43-0c0e6b0f2a11"),
        );
        assert_eq!(
            extract_user_id(&headers).unwrap().to_string(),
            "6f1c1f8e-7a5b-4a7e-9a43-0c0e6b0f2a11"
        );
    }
}
