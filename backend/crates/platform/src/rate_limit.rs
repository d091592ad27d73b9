//! Rate Limiting Infrastructure
//!
//! Sliding-window policy: every check counts events in `[now - window, now]`,
//! so a lockout clears on its own once the oldest counted event ages out.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Events allowed in the window before the limit trips
    pub max_requests: u32,
    /// Trailing window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    /// 5 failures per 15 minutes
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(15 * 60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }

    /// Start of the trailing window ending at `now`
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::milliseconds(self.window_ms())
    }

    /// Whether `count` events inside the window trip the limit
    pub fn is_exceeded(&self, count: u64) -> bool {
        count >= u64::from(self.max_requests)
    }

    /// How many more events the window tolerates
    pub fn remaining(&self, count: u64) -> u32 {
        u64::from(self.max_requests)
            .saturating_sub(count)
            .try_into()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = RateLimitConfig::default();
        assert_eq!(config.max_requests, 5);
        assert_eq!(config.window_ms(), 15 * 60 * 1000);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let config = RateLimitConfig::default();
        assert!(!config.is_exceeded(4));
        assert!(config.is_exceeded(5));
        assert!(config.is_exceeded(6));
        assert_eq!(config.remaining(3), 2);
        assert_eq!(config.remaining(9), 0);
    }

    #[test]
    fn test_window_start() {
        let config = RateLimitConfig::new(3, 60);
        let now = Utc::now();
        assert_eq!(now - config.window_start(now), chrono::Duration::seconds(60));
    }
}
