use kernel::error::app_error::{AppError, AppResult};
use std::fmt;

/// Compact JWS string (`header.payload.signature`)
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let segments: Vec<&str> = value.split('.').collect();
        let well_formed = segments.len() == 3
            && segments.iter().all(|s| {
                !s.is_empty()
                    && s
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            });
        if !well_formed {
            return Err(AppError::bad_request("Malformed access token").with_code("INVALID_TOKEN_FORMAT"));
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
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_validation() {
        assert!(AccessToken::new("aGVhZA.cGF5bG9hZA.c2ln").is_ok());
        assert!(AccessToken::new("only.two").is_err());
        assert!(AccessToken::new("a..c").is_err());
        assert!(AccessToken::new("a.b.c d").is_err());
    }
}
