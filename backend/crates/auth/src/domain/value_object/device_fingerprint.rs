//! Device Fingerprint Value Object
//!
//! Digest of the user agent and IP a session was opened from. Stored on the
//! session and compared on refresh; a mismatch is reported, never enforced.

use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ip_address::IpAddress, user_agent::UserAgent};

pub const FINGERPRINT_MIN_LENGTH: usize = 10;
pub const FINGERPRINT_MAX_LENGTH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    /// Wrap an externally supplied fingerprint
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let length = value.chars().count();
        if !(FINGERPRINT_MIN_LENGTH..=FINGERPRINT_MAX_LENGTH).contains(&length) {
            return Err(AppError::bad_request(format!(
                "Device fingerprint must be {FINGERPRINT_MIN_LENGTH}-{FINGERPRINT_MAX_LENGTH} characters (got {length})"
            ))
            .with_code("INVALID_DEVICE_FINGERPRINT"));
        }
        Ok(Self(value))
    }

    /// Derive the fingerprint for a `(user_agent, ip)` pair
    pub fn derive(user_agent: &UserAgent, ip: &IpAddress) -> Self {
        // 43 characters, always within bounds
        Self(platform::client::device_fingerprint(user_agent.as_str(), ip.addr()))
    }

    pub fn from_db(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_bounds() {
        assert!(DeviceFingerprint::new("short").is_err());
        assert!(DeviceFingerprint::new("a".repeat(FINGERPRINT_MIN_LENGTH)).is_ok());
        assert!(DeviceFingerprint::new("a".repeat(FINGERPRINT_MAX_LENGTH)).is_ok());
        assert!(DeviceFingerprint::new("a".repeat(FINGERPRINT_MAX_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_derive_is_stable_and_valid() {
        let ua = UserAgent::new("Mozilla/5.0");
        let ip = IpAddress::parse("198.51.100.4").unwrap();
        let a = DeviceFingerprint::derive(&ua, &ip);
        assert_eq!(a, DeviceFingerprint::derive(&ua, &ip));
        assert!(DeviceFingerprint::new(a.as_str()).is_ok());

        let other_ip = IpAddress::parse("198.51.100.5").unwrap();
        assert_ne!(a, DeviceFingerprint::derive(&ua, &other_ip));
    }
}
