//! Login Attempt Entity
//!
//! Append-only audit fact. Never updated or deleted by the request path.

use chrono::{DateTime, Duration, Utc};
use derive_more::Display;
use kernel::id::LoginAttemptId;
use serde::{Deserialize, Serialize};

use crate::domain::value_object::{ip_address::IpAddress, user_agent::UserAgent, user_name::UserName};

/// Why a login attempt failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    #[display("rate_limited")]
    RateLimited,
    #[display("invalid_credentials")]
    InvalidCredentials,
    #[display("account_disabled")]
    AccountDisabled,
}

impl FailureReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::InvalidCredentials => "invalid_credentials",
            Self::AccountDisabled => "account_disabled",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "rate_limited" => Some(Self::RateLimited),
            "invalid_credentials" => Some(Self::InvalidCredentials),
            "account_disabled" => Some(Self::AccountDisabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub attempt_id: LoginAttemptId,
    pub user_name: UserName,
    pub ip_address: IpAddress,
    pub user_agent: UserAgent,
    pub success: bool,
    pub failure_reason: Option<FailureReason>,
    pub attempted_at: DateTime<Utc>,
}

impl LoginAttempt {
    pub fn succeeded(
        user_name: UserName,
        ip_address: IpAddress,
        user_agent: UserAgent,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            attempt_id: LoginAttemptId::new(),
            user_name,
            ip_address,
            user_agent,
            success: true,
            failure_reason: None,
            attempted_at: now,
        }
    }

    pub fn failed(
        user_name: UserName,
        ip_address: IpAddress,
        user_agent: UserAgent,
        reason: FailureReason,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            attempt_id: LoginAttemptId::new(),
            user_name,
            ip_address,
            user_agent,
            success: false,
            failure_reason: Some(reason),
            attempted_at: now,
        }
    }

    /// Happened within `within` before `now`
    pub fn is_recent(&self, within: Duration, now: DateTime<Utc>) -> bool {
        self.attempted_at > now - within && self.attempted_at <= now
    }

    /// A failure that hit the throttle or came without a user agent
    pub fn is_suspicious(&self) -> bool {
        !self.success
            && (self.failure_reason == Some(FailureReason::RateLimited)
                || self.user_agent.is_unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> UserName {
        UserName::new("alice").unwrap()
    }

    fn ip() -> IpAddress {
        IpAddress::parse("192.0.2.1").unwrap()
    }

    #[test]
    fn test_success_has_no_reason() {
        let attempt = LoginAttempt::succeeded(name(), ip(), UserAgent::new("curl/8"), Utc::now());
        assert!(attempt.success);
        assert_eq!(attempt.failure_reason, None);
        assert!(!attempt.is_suspicious());
    }

    #[test]
    fn test_is_recent() {
        let now = Utc::now();
        let attempt = LoginAttempt::failed(
            name(),
            ip(),
            UserAgent::new("curl/8"),
            FailureReason::InvalidCredentials,
            now - Duration::minutes(10),
        );
        assert!(attempt.is_recent(Duration::minutes(15), now));
        assert!(!attempt.is_recent(Duration::minutes(5), now));
    }

    #[test]
    fn test_is_suspicious() {
        let now = Utc::now();
        let throttled = LoginAttempt::failed(
            name(),
            ip(),
            UserAgent::new("curl/8"),
            FailureReason::RateLimited,
            now,
        );
        assert!(throttled.is_suspicious());

        let anonymous = LoginAttempt::failed(
            name(),
            ip(),
            UserAgent::new(""),
            FailureReason::InvalidCredentials,
            now,
        );
        assert!(anonymous.is_suspicious());

        let plain = LoginAttempt::failed(
            name(),
            ip(),
            UserAgent::new("curl/8"),
            FailureReason::InvalidCredentials,
            now,
        );
        assert!(!plain.is_suspicious());
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(FailureReason::AccountDisabled.to_string(), "account_disabled");
        assert_eq!(
            FailureReason::from_code(FailureReason::RateLimited.as_str()),
            Some(FailureReason::RateLimited)
        );
        assert_eq!(FailureReason::from_code("bogus"), None);
    }
}
