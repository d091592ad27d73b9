//! Error Kind
//!
//! Transport-level classification of an error. Each kind carries the status
//! a gateway would answer with, its reason phrase, and a fallback machine
//! code for errors that do not name their own.

use serde::Serialize;

/// Status class of an error
///
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// assert_eq!(ErrorKind::Unauthorized.status_code(), 401);
/// assert_eq!(ErrorKind::Conflict.default_code(), "CONFLICT");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Malformed input
    BadRequest,
    /// Bad credentials, token or session
    Unauthorized,
    Forbidden,
    NotFound,
    /// The caller cancelled
    RequestTimeout,
    /// Business rule refused the operation (lockout, expired refresh)
    Conflict,
    TooManyRequests,
    InternalServerError,
    /// Storage unavailable or a retryable conflict that ran out of retries
    ServiceUnavailable,
}

impl ErrorKind {
    /// `(status, reason phrase, fallback code)`
    const fn parts(&self) -> (u16, &'static str, &'static str) {
        match self {
            ErrorKind::BadRequest => (400, "Bad Request", "BAD_REQUEST"),
            ErrorKind::Unauthorized => (401, "Unauthorized", "UNAUTHORIZED"),
            ErrorKind::Forbidden => (403, "Forbidden", "FORBIDDEN"),
            ErrorKind::NotFound => (404, "Not Found", "NOT_FOUND"),
            ErrorKind::RequestTimeout => (408, "Request Timeout", "REQUEST_TIMEOUT"),
            ErrorKind::Conflict => (409, "Conflict", "CONFLICT"),
            ErrorKind::TooManyRequests => (429, "Too Many Requests", "TOO_MANY_REQUESTS"),
            ErrorKind::InternalServerError => (500, "Internal Server Error", "INTERNAL_ERROR"),
            ErrorKind::ServiceUnavailable => (503, "Service Unavailable", "SERVICE_UNAVAILABLE"),
        }
    }

    #[inline]
    pub const fn status_code(&self) -> u16 {
        self.parts().0
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.parts().1
    }

    /// Code used when an [`AppError`](super::app_error::AppError) has none of its own
    #[inline]
    pub const fn default_code(&self) -> &'static str {
        self.parts().2
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
