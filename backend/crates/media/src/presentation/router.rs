//! Media Router

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use platform::rate_limit::RateLimitStore;

use crate::domain::repository::ProfileImageRepository;
use crate::presentation::handlers::{self, MediaAppState};

/// Multipart framing allowance on top of the raw image limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Routes mounted under `/api/user`
pub fn media_router<R, L>(state: MediaAppState<R, L>) -> Router
where
    R: ProfileImageRepository + Send + Sync + 'static,
    L: RateLimitStore + Send + Sync + 'static,
{
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/upload-image", post(handlers::upload_image::<R, L>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
