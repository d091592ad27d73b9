//! Refresh token value stored on a session
//!
//! Opaque to the session store. Looked up by exact value and replaced on
//! every rotation.

use kernel::error::app_error::{AppError, AppResult};
use platform::crypto::constant_time_eq;
use std::fmt;

pub const REFRESH_TOKEN_MIN_LENGTH: usize = 32;

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RefreshTokenValue(String);

impl RefreshTokenValue {
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.len() < REFRESH_TOKEN_MIN_LENGTH {
            return Err(AppError::bad_request(format!(
                "Refresh token must be at least {REFRESH_TOKEN_MIN_LENGTH} characters"
            ))
            .with_code("INVALID_REFRESH_TOKEN"));
        }
        Ok(Self(value))
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Timing-safe equality against a presented value
    pub fn matches(&self, presented: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), presented.as_bytes())
    }
}

impl fmt::Debug for RefreshTokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshTokenValue").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_length() {
        assert!(RefreshTokenValue::new("x".repeat(31)).is_err());
        assert!(RefreshTokenValue::new(platform::crypto::random_token(32)).is_ok());
    }

    #[test]
    fn test_matches_and_redaction() {
        let raw = platform::crypto::random_token(32);
        let value = RefreshTokenValue::new(raw.clone()).unwrap();
        assert!(value.matches(&raw));
        assert!(!value.matches("something-else-entirely-0123456789"));
        assert!(!format!("{value:?}").contains(&raw));
    }
}
