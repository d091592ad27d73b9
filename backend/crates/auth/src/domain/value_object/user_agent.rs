//! User-Agent header value
//!
//! Missing or blank headers are recorded as `"unknown"` so every session and
//! login attempt carries a value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder for absent user agents
pub const UNKNOWN_USER_AGENT: &str = "unknown";

/// Longest stored user agent (in characters); longer values are truncated
pub const USER_AGENT_MAX_LENGTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserAgent(String);

impl UserAgent {
    pub fn new(raw: impl AsRef<str>) -> Self {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Self::unknown();
        }
        Self(trimmed.chars().take(USER_AGENT_MAX_LENGTH).collect())
    }

    pub fn unknown() -> Self {
        Self(UNKNOWN_USER_AGENT.to_string())
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_USER_AGENT
    }
}

impl fmt::Display for UserAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
