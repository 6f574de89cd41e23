//! Catalog Error Types

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Anime not found")]
    NotFound,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Too many requests, try again in {retry_after_secs} seconds")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// Upstream gave up after retries, or returned nothing usable
    #[error("Catalog service unavailable")]
    UpstreamUnavailable,

    /// Non-success status from an upstream
    #[error("Upstream responded with status {status}")]
    UpstreamStatus { status: u16 },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NotFound => ErrorKind::NotFound,
            CatalogError::InvalidQuery(_) => ErrorKind::BadRequest,
            CatalogError::RateLimitExceeded { .. } => ErrorKind::TooManyRequests,
            CatalogError::UpstreamUnavailable => ErrorKind::ServiceUnavailable,
            CatalogError::UpstreamStatus { .. } | CatalogError::Http(_) => ErrorKind::BadGateway,
            CatalogError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Worth another attempt: upstream throttling, 5xx, timeouts and
    /// connection failures.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::UpstreamStatus { status } => *status == 429 || *status >= 500,
            CatalogError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    fn log(&self) {
        match self {
            CatalogError::Internal(msg) => {
                tracing::error!(message = %msg, "Catalog internal error");
            }
            CatalogError::UpstreamUnavailable
            | CatalogError::UpstreamStatus { .. }
            | CatalogError::Http(_) => {
                tracing::warn!(error = %self, "Catalog upstream failure");
            }
            CatalogError::RateLimitExceeded { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "API rate limit exceeded");
            }
            _ => {
                tracing::debug!(error = %self, "Catalog request rejected");
            }
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let app = AppError::new(err.kind(), err.to_string());
        match err {
            CatalogError::RateLimitExceeded { retry_after_secs } => {
                app.with_retry_after(retry_after_secs)
            }
            other => app.with_source(other),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CatalogError::UpstreamStatus { status: 429 }.is_transient());
        assert!(CatalogError::UpstreamStatus { status: 503 }.is_transient());
        assert!(!CatalogError::UpstreamStatus { status: 404 }.is_transient());
        assert!(!CatalogError::NotFound.is_transient());
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CatalogError::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(
            CatalogError::UpstreamUnavailable.kind(),
            ErrorKind::ServiceUnavailable
        );
        let app: AppError = CatalogError::RateLimitExceeded {
            retry_after_secs: 9,
        }
        .into();
        assert_eq!(app.retry_after_secs(), Some(9));
    }
}
