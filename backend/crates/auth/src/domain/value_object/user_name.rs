//! User Name Value Object
//!
//! ユーザー名はログイン時の識別子。大文字小文字は区別し、前後の空白は除去する。
//!
//! ## 不変条件
//! - 空白除去後に空でない
//! - 最大 64 文字
//! - 空白文字・制御文字を含まない

use kernel::error::app_error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for user name (in characters)
pub const USER_NAME_MAX_LENGTH: usize = 64;

/// Error returned when user name validation fails
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserNameError {
    /// User name is empty after trimming
    Empty,

    /// User name is too long (maximum: USER_NAME_MAX_LENGTH)
    TooLong { length: usize, max: usize },

    /// User name contains whitespace in the middle
    ContainsWhitespace,

    /// User name contains a control character
    InvalidCharacter { position: usize },
}

impl fmt::Display for UserNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Username cannot be empty"),
            Self::TooLong { length, max } => {
                write!(f, "Username is too long ({length} chars, maximum {max})")
            }
            Self::ContainsWhitespace => write!(f, "Username cannot contain whitespace"),
            Self::InvalidCharacter { position } => {
                write!(f, "Username contains an invalid character at position {position}")
            }
        }
    }
}

impl std::error::Error for UserNameError {}

impl From<UserNameError> for AppError {
    fn from(err: UserNameError) -> Self {
        AppError::bad_request(err.to_string()).with_code("INVALID_USERNAME")
    }
}

/// Validated user name
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserName(String);

impl UserName {
    /// Trim and validate raw input
    pub fn new(input: impl AsRef<str>) -> Result<Self, UserNameError> {
        let trimmed = input.as_ref().trim();
        Self::validate(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// Create from database values (assumes already validated)
    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }

    fn validate(value: &str) -> Result<(), UserNameError> {
        if value.is_empty() {
            return Err(UserNameError::Empty);
        }

        let length = value.chars().count();
        if length > USER_NAME_MAX_LENGTH {
            return Err(UserNameError::TooLong {
                length,
                max: USER_NAME_MAX_LENGTH,
            });
        }

        for (position, ch) in value.chars().enumerate() {
            if ch.is_control() {
                return Err(UserNameError::InvalidCharacter { position });
            }
            if ch.is_whitespace() {
                return Err(UserNameError::ContainsWhitespace);
            }
        }

        Ok(())
    }
}

impl fmt::Debug for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserName").field(&self.0).finish()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UserName {
    type Error = UserNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserName> for String {
    fn from(name: UserName) -> Self {
        name.0
    }
}

impl AsRef<str> for UserName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_user_names() {
        assert_eq!(UserName::new("alice").unwrap().as_str(), "alice");
        assert_eq!(UserName::new("  Bob.Smith  ").unwrap().as_str(), "Bob.Smith");
        assert!(UserName::new("ユーザー").is_ok());
    }

    #[test]
    fn test_empty_user_name() {
        assert_eq!(UserName::new(""), Err(UserNameError::Empty));
        assert_eq!(UserName::new("   "), Err(UserNameError::Empty));
    }

    #[test]
    fn test_length_limit() {
        assert!(UserName::new("a".repeat(USER_NAME_MAX_LENGTH)).is_ok());
        assert!(matches!(
            UserName::new("a".repeat(USER_NAME_MAX_LENGTH + 1)),
            Err(UserNameError::TooLong { .. })
        ));
    }

    #[test]
    fn test_rejects_inner_whitespace_and_control() {
        assert_eq!(
            UserName::new("john doe"),
            Err(UserNameError::ContainsWhitespace)
        );
        assert_eq!(
            UserName::new("john\u{0}"),
            Err(UserNameError::InvalidCharacter { position: 4 })
        );
    }

    #[test]
    fn test_converts_to_validation_error() {
        let err: AppError = UserName::new("").unwrap_err().into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.code(), "INVALID_USERNAME");
    }
}
