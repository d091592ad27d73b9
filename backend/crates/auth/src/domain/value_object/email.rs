//! Email Value Object
//!
//! Contact address shown on the profile. Authentication never uses it, so
//! only the shape is checked: one `@`, a dotted ASCII domain, RFC 5321
//! length limits. Stored lowercased.

use derive_more::Display;
use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const MAX_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn new(raw: impl Into<String>) -> AppResult<Self> {
        let normalized = raw.into().trim().to_lowercase();
        match shape_problem(&normalized) {
            None => Ok(Self(normalized)),
            Some(problem) => {
                Err(AppError::bad_request(problem).with_code("INVALID_EMAIL"))
            }
        }
    }

    /// Rebuild from a stored column without re-validating
    pub fn from_db(stored: impl Into<String>) -> Self {
        Self(stored.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_db(self) -> String {
        self.0
    }
}

fn shape_problem(email: &str) -> Option<String> {
    if email.is_empty() {
        return Some("Email cannot be empty".to_string());
    }
    if email.len() > MAX_LEN {
        return Some(format!("Email must be at most {MAX_LEN} characters"));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Some("Email must contain '@'".to_string());
    };
    let domain_ok = domain.contains('.')
        && !domain.starts_with(['.', '-'])
        && !domain.ends_with(['.', '-'])
        && domain
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-');

    if local.is_empty() || local.len() > MAX_LOCAL_LEN || !domain_ok {
        return Some("Invalid email format".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_addresses() {
        for ok in ["alice@example.com", "a.b+auth@mail.example.org", "x@sub-1.example.io"] {
            assert!(Email::new(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "alice", "alice@", "@example.com", "a@b@example.com", "a@localhost", "a@.example.com", "a@example.com-"] {
            let err = Email::new(bad).unwrap_err();
            assert_eq!(err.code(), "INVALID_EMAIL", "{bad}");
        }
        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(Email::new(long_local).is_err());
    }

    #[test]
    fn test_normalizes_case_and_whitespace() {
        let email = Email::new("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
        assert_eq!(email.to_string(), "alice@example.com");
    }
}
