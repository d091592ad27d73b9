//! Throttle Ledger
//!
//! Sliding-window lockout over the login attempt ledger. Each check
//! re-counts failures for the exact `(user_name, ip)` pair since
//! `now - window`, so a lockout lifts by itself once old failures age out.

use chrono::{DateTime, Utc};
use platform::rate_limit::RateLimitConfig;

use crate::domain::entity::login_attempt::LoginAttempt;
use crate::domain::repository::LoginAttemptRepository;
use crate::domain::value_object::{ip_address::IpAddress, user_name::UserName};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone)]
pub struct ThrottleLedger {
    policy: RateLimitConfig,
}

impl ThrottleLedger {
    pub fn new(policy: RateLimitConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RateLimitConfig {
        &self.policy
    }

    /// `AccountLocked` once the pair has `max_requests` failures in the window
    pub async fn check<S>(
        &self,
        store: &S,
        user_name: &UserName,
        ip: &IpAddress,
        now: DateTime<Utc>,
    ) -> AuthResult<()>
    where
        S: LoginAttemptRepository + Sync,
    {
        let since = self.policy.window_start(now);
        let failures = store.count_failures_since(user_name, ip, since).await?;

        if self.policy.is_exceeded(failures) {
            tracing::warn!(
                user_name = %user_name,
                ip = %ip,
                failures,
                "Login throttled"
            );
            return Err(AuthError::AccountLocked);
        }

        Ok(())
    }

    /// Append an attempt; failures are logged and swallowed
    pub async fn record<S>(&self, store: &S, attempt: &LoginAttempt)
    where
        S: LoginAttemptRepository + Sync,
    {
        if let Err(e) = store.append_attempt(attempt).await {
            tracing::warn!(
                user_name = %attempt.user_name,
                ip = %attempt.ip_address,
                success = attempt.success,
                error = %e,
                "Failed to record login attempt"
            );
        }
    }
}
