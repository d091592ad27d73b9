//! Session Entity
//!
//! One authenticated device. Lifecycle:
//!
//! ```text
//! Active ──(access expiry)──▶ AccessExpired ──(refresh expiry)──▶ RefreshExpired
//!    └──────────────┴──────────────────────┴──────▶ Invalidated (terminal)
//! ```
//!
//! Every time-dependent method takes `now` so callers decide which clock
//! applies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::value_object::{
    access_token::AccessToken, device_fingerprint::DeviceFingerprint, ip_address::IpAddress,
    refresh_token::RefreshTokenValue, session_id::SessionId, user_agent::UserAgent,
    user_id::UserId,
};
use crate::error::{AuthError, AuthResult};

/// Where a session sits in its lifecycle at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    AccessExpired,
    RefreshExpired,
    Invalidated,
}

/// Session entity
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub access_token: AccessToken,
    /// Current refresh value; replaced on every rotation
    pub refresh_token: RefreshTokenValue,
    pub device_fingerprint: DeviceFingerprint,
    pub ip_address: IpAddress,
    pub user_agent: UserAgent,
    /// False once invalidated; never flips back
    pub is_active: bool,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// Inputs for a freshly opened session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub access_token: AccessToken,
    pub refresh_token: RefreshTokenValue,
    pub device_fingerprint: DeviceFingerprint,
    pub ip_address: IpAddress,
    pub user_agent: UserAgent,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl Session {
    /// Open a session
    ///
    /// Refresh expiry must come strictly after access expiry.
    pub fn open(new: NewSession, now: DateTime<Utc>) -> AuthResult<Self> {
        if new.refresh_expires_at <= new.access_expires_at {
            return Err(AuthError::Internal(
                "refresh expiry must be after access expiry".to_string(),
            ));
        }

        Ok(Self {
            session_id: new.session_id,
            user_id: new.user_id,
            access_token: new.access_token,
            refresh_token: new.refresh_token,
            device_fingerprint: new.device_fingerprint,
            ip_address: new.ip_address,
            user_agent: new.user_agent,
            is_active: true,
            access_expires_at: new.access_expires_at,
            refresh_expires_at: new.refresh_expires_at,
            created_at: now,
            updated_at: now,
            last_activity_at: now,
        })
    }

    pub fn state(&self, now: DateTime<Utc>) -> SessionState {
        if !self.is_active {
            SessionState::Invalidated
        } else if now >= self.refresh_expires_at {
            SessionState::RefreshExpired
        } else if now >= self.access_expires_at {
            SessionState::AccessExpired
        } else {
            SessionState::Active
        }
    }

    /// Access token has passed its expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_expires_at
    }

    /// Active and the access token is still current
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == SessionState::Active
    }

    /// Active and inside the refresh window
    pub fn can_refresh(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.refresh_expires_at
    }

    /// Swap in a new access token; refresh value and expiry are untouched
    pub fn refresh_access_token(
        &mut self,
        token: AccessToken,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        if !self.can_refresh(now) {
            return Err(AuthError::RefreshTokenExpired);
        }
        self.access_token = token;
        self.access_expires_at = expires_at;
        self.updated_at = now;
        Ok(())
    }

    /// Replace the refresh value; the previous one stops matching immediately
    pub fn rotate_refresh_token(
        &mut self,
        value: RefreshTokenValue,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        if !self.can_refresh(now) {
            return Err(AuthError::RefreshTokenExpired);
        }
        self.refresh_token = value;
        self.updated_at = now;
        Ok(())
    }

    /// Terminal; returns whether this call changed anything
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.updated_at = now;
        true
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity_at = now;
    }

    /// Same device as the one that opened the session
    pub fn matches_device(&self, fingerprint: &DeviceFingerprint) -> bool {
        platform::crypto::constant_time_eq(
            self.device_fingerprint.as_str().as_bytes(),
            fingerprint.as_str().as_bytes(),
        )
    }
}

/// Session info for listings (non-sensitive)
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub user_agent: String,
    pub ip_address: String,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub is_current: bool,
}

impl SessionSummary {
    pub fn from_session(session: &Session, current: Option<SessionId>) -> Self {
        Self {
            session_id: session.session_id,
            user_agent: session.user_agent.as_str().to_string(),
            ip_address: session.ip_address.to_string(),
            created_at: session.created_at,
            last_activity_at: session.last_activity_at,
            is_current: current == Some(session.session_id),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Duration;

    pub const ACCESS_JWT: &str = "aGVhZGVy.cGF5bG9hZA.c2lnbmF0dXJl";

    pub fn new_session(user_id: UserId, now: DateTime<Utc>) -> NewSession {
        let ua = UserAgent::new("Mozilla/5.0 (X11; Linux x86_64)");
        let ip = IpAddress::parse("203.0.113.10").unwrap();
        NewSession {
            session_id: SessionId::new(),
            user_id,
            access_token: AccessToken::new(ACCESS_JWT).unwrap(),
            refresh_token: RefreshTokenValue::new(platform::crypto::random_token(32)).unwrap(),
            device_fingerprint: DeviceFingerprint::derive(&ua, &ip),
            ip_address: ip,
            user_agent: ua,
            access_expires_at: now + Duration::minutes(15),
            refresh_expires_at: now + Duration::days(7),
        }
    }

    pub fn session(user_id: UserId, now: DateTime<Utc>) -> Session {
        Session::open(new_session(user_id, now), now).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_open_rejects_inverted_expiry() {
        let now = Utc::now();
        let mut new = fixtures::new_session(UserId::new(), now);
        new.refresh_expires_at = new.access_expires_at;
        assert!(Session::open(new, now).is_err());
    }

    #[test]
    fn test_state_machine_over_time() {
        let now = Utc::now();
        let session = fixtures::session(UserId::new(), now);

        assert_eq!(session.state(now), SessionState::Active);
        assert!(session.is_valid(now));
        assert_eq!(
            session.state(now + Duration::minutes(15)),
            SessionState::AccessExpired
        );
        assert!(session.is_expired(now + Duration::minutes(15)));
        assert!(session.can_refresh(now + Duration::minutes(15)));
        assert_eq!(
            session.state(now + Duration::days(7)),
            SessionState::RefreshExpired
        );
        assert!(!session.can_refresh(now + Duration::days(7)));
    }

    #[test]
    fn test_refresh_expired_never_refreshable() {
        let now = Utc::now();
        let mut session = fixtures::session(UserId::new(), now);
        let later = now + Duration::days(8);
        assert!(!session.can_refresh(later));

        session.deactivate(now);
        assert!(!session.can_refresh(later));
        assert!(!session.can_refresh(now));
    }

    #[test]
    fn test_deactivate_is_terminal_and_idempotent() {
        let now = Utc::now();
        let mut session = fixtures::session(UserId::new(), now);
        assert!(session.deactivate(now));
        assert!(!session.deactivate(now + Duration::seconds(1)));
        assert_eq!(session.updated_at, now);
        assert_eq!(session.state(now), SessionState::Invalidated);

        let result = session.refresh_access_token(
            AccessToken::new(fixtures::ACCESS_JWT).unwrap(),
            now + Duration::minutes(30),
            now,
        );
        assert!(matches!(result, Err(AuthError::RefreshTokenExpired)));
        assert!(!session.is_active);
    }

    #[test]
    fn test_refresh_keeps_refresh_window() {
        let now = Utc::now();
        let mut session = fixtures::session(UserId::new(), now);
        let refresh_expiry = session.refresh_expires_at;
        let later = now + Duration::minutes(20);

        session
            .refresh_access_token(
                AccessToken::new("bmV3.YWNjZXNz.dG9rZW4").unwrap(),
                later + Duration::minutes(15),
                later,
            )
            .unwrap();
        assert_eq!(session.access_token.as_str(), "bmV3.YWNjZXNz.dG9rZW4");
        assert_eq!(session.refresh_expires_at, refresh_expiry);
        assert!(session.is_valid(later));
    }

    #[test]
    fn test_rotation_replaces_refresh_value() {
        let now = Utc::now();
        let mut session = fixtures::session(UserId::new(), now);
        let old = session.refresh_token.as_str().to_string();
        let fresh = platform::crypto::random_token(32);

        session
            .rotate_refresh_token(RefreshTokenValue::new(fresh.clone()).unwrap(), now)
            .unwrap();
        assert!(session.refresh_token.matches(&fresh));
        assert!(!session.refresh_token.matches(&old));
    }

    #[test]
    fn test_touch_leaves_expiry_alone() {
        let now = Utc::now();
        let mut session = fixtures::session(UserId::new(), now);
        let access = session.access_expires_at;
        session.touch(now + Duration::minutes(5));
        assert_eq!(session.last_activity_at, now + Duration::minutes(5));
        assert_eq!(session.access_expires_at, access);
    }

    #[test]
    fn test_matches_device() {
        let now = Utc::now();
        let session = fixtures::session(UserId::new(), now);
        let same = DeviceFingerprint::derive(
            &UserAgent::new("Mozilla/5.0 (X11; Linux x86_64)"),
            &IpAddress::parse("203.0.113.10").unwrap(),
        );
        let other = DeviceFingerprint::derive(
            &UserAgent::new("curl/8.0"),
            &IpAddress::parse("203.0.113.10").unwrap(),
        );
        assert!(session.matches_device(&same));
        assert!(!session.matches_device(&other));
    }

    #[test]
    fn test_summary_marks_current() {
        let now = Utc::now();
        let session = fixtures::session(UserId::new(), now);
        let summary = SessionSummary::from_session(&session, Some(session.session_id));
        assert!(summary.is_current);
        assert_eq!(summary.ip_address, "203.0.113.10");
        assert!(!SessionSummary::from_session(&session, None).is_current);
    }
}
