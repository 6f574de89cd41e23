//! Per-client rate limiting for the public catalog routes

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::client_identifier;
use platform::rate_limit::{RateLimitConfig, RateLimitPolicy, RateLimitStore};

use crate::error::CatalogError;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Middleware state
pub struct ApiRateLimitState<L> {
    pub limiter: Arc<L>,
    pub config: RateLimitConfig,
}

impl<L> Clone for ApiRateLimitState<L> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            config: self.config,
        }
    }
}

/// Count the request against the client's `api` window; deny with 429 once
/// the window is spent.
pub async fn api_rate_limit<L>(
    State(state): State<ApiRateLimitState<L>>,
    req: Request,
    next: Next,
) -> Response
where
    L: RateLimitStore + Send + Sync + 'static,
{
    let key = RateLimitPolicy::Api.key(&client_identifier(req.headers()));

    let result = match state.limiter.check_and_increment(&key, &state.config).await {
        Ok(result) => result,
        Err(e) => {
            // Fail open: the limiter is local, an error here is a bug, not abuse
            tracing::error!(error = %e, "Rate limiter unavailable");
            return next.run(req).await;
        }
    };

    if !result.allowed {
        let retry_after_secs = result.retry_after_secs(state.limiter.now_ms()).max(1);
        tracing::debug!(key = %key, retry_after_secs, "API request throttled");
        return CatalogError::RateLimitExceeded { retry_after_secs }.into_response();
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        RATE_LIMIT_LIMIT_HEADER,
        HeaderValue::from(state.config.max_requests),
    );
    headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(result.remaining));
    response
}
