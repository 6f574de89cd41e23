//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum that maps to HTTP status codes.

use serde::Serialize;

/// Error classification shared by every crate.
///
/// Each variant maps onto exactly one HTTP status code, so handlers never
/// pick status codes by hand.
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::UnsupportedMediaType;
/// assert_eq!(kind.status_code(), 415);
/// assert_eq!(kind.as_str(), "Unsupported Media Type");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// 400 - malformed request or invalid content
    BadRequest,
    /// 401 - caller identity missing
    Unauthorized,
    /// 404 - resource does not exist (or upstream had nothing)
    NotFound,
    /// 413 - payload above a size ceiling
    PayloadTooLarge,
    /// 415 - declared media type not on the allow-list
    UnsupportedMediaType,
    /// 429 - rate limit exceeded
    TooManyRequests,
    /// 500
    InternalServerError,
    /// 502 - upstream answered with garbage
    BadGateway,
    /// 503 - upstream or dependency unavailable
    ServiceUnavailable,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    ///
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::PayloadTooLarge.status_code(), 413);
    /// assert_eq!(ErrorKind::TooManyRequests.status_code(), 429);
    /// ```
    #[inline]
    pub const fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::PayloadTooLarge => 413,
            ErrorKind::UnsupportedMediaType => 415,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::InternalServerError => 500,
            ErrorKind::BadGateway => 502,
            ErrorKind::ServiceUnavailable => 503,
        }
    }

    /// Standard reason phrase.
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::PayloadTooLarge => "Payload Too Large",
            ErrorKind::UnsupportedMediaType => "Unsupported Media Type",
            ErrorKind::TooManyRequests => "Too Many Requests",
            ErrorKind::InternalServerError => "Internal Server Error",
            ErrorKind::BadGateway => "Bad Gateway",
            ErrorKind::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// 5xx kinds; these are logged at error level.
    #[inline]
    pub const fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
