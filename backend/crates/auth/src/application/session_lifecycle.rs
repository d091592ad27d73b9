//! Session Lifecycle Manager
//!
//! Owns the rules for opening, refreshing and closing sessions. Holds no
//! state of its own: every operation runs against the store it is handed,
//! which may be a pooled store or an open transaction.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use platform::clock::Clock;

use crate::application::token_issuer::{IssuedToken, TokenIssuer, TokenSubject};
use crate::domain::entity::session::{NewSession, Session, SessionState};
use crate::domain::repository::AuthStores;
use crate::domain::value_object::{
    access_token::AccessToken, device_fingerprint::DeviceFingerprint, ip_address::IpAddress,
    refresh_token::RefreshTokenValue, session_id::SessionId, token_type::TokenType,
    user_agent::UserAgent, user_id::UserId, user_role::UserRole,
};
use crate::error::{AuthError, AuthResult};

/// The client a request came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub user_agent: UserAgent,
    pub ip_address: IpAddress,
}

impl DeviceInfo {
    pub fn new(user_agent: UserAgent, ip_address: IpAddress) -> Self {
        Self {
            user_agent,
            ip_address,
        }
    }

    pub fn fingerprint(&self) -> DeviceFingerprint {
        DeviceFingerprint::derive(&self.user_agent, &self.ip_address)
    }
}

/// Access and refresh tokens minted together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session: Session,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct SessionLifecycleManager {
    issuer: Arc<TokenIssuer>,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
}

impl SessionLifecycleManager {
    pub fn new(issuer: Arc<TokenIssuer>, clock: Arc<dyn Clock>, access_ttl: Duration) -> Self {
        Self {
            issuer,
            clock,
            access_ttl,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Open a session for `user_id` and mint its first token pair
    pub async fn create_session<S: AuthStores>(
        &self,
        store: &S,
        user_id: &UserId,
        device: &DeviceInfo,
        refresh_ttl: Duration,
    ) -> AuthResult<CreatedSession> {
        let user = store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let now = self.now();
        let subject = TokenSubject {
            user_id: user.user_id,
            session_id: SessionId::new(),
            role: user.user_role,
        };

        let access = self
            .issuer
            .issue(subject, TokenType::Access, now, now + self.access_ttl)?;
        let refresh = self
            .issuer
            .issue(subject, TokenType::Refresh, now, now + refresh_ttl)?;

        let session = Session::open(
            NewSession {
                session_id: subject.session_id,
                user_id: user.user_id,
                access_token: AccessToken::new(access.token.clone())?,
                refresh_token: RefreshTokenValue::new(refresh.token.clone())?,
                device_fingerprint: device.fingerprint(),
                ip_address: device.ip_address,
                user_agent: device.user_agent.clone(),
                access_expires_at: access.expires_at(),
                refresh_expires_at: refresh.expires_at(),
            },
            now,
        )?;

        store.insert_session(&session).await?;

        tracing::info!(
            user_id = %session.user_id,
            session_id = %session.session_id,
            ip = %session.ip_address,
            refresh_expires_at = %session.refresh_expires_at,
            "Session created"
        );

        Ok(CreatedSession {
            session,
            tokens: TokenPair { access, refresh },
        })
    }

    /// Load a session that can still back a credential
    ///
    /// An expired access token alone does not disqualify it.
    pub async fn validate_session<S: AuthStores>(
        &self,
        store: &S,
        session_id: &SessionId,
    ) -> AuthResult<Session> {
        let session = store
            .find_session(session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        match session.state(self.now()) {
            SessionState::Active | SessionState::AccessExpired => Ok(session),
            state => {
                tracing::debug!(session_id = %session_id, ?state, "Session not usable");
                Err(AuthError::SessionNotFound)
            }
        }
    }

    /// Full rotation: new access token, new refresh value, same refresh expiry
    pub async fn rotate<S: AuthStores>(
        &self,
        store: &S,
        session: &mut Session,
        role: UserRole,
    ) -> AuthResult<TokenPair> {
        let now = self.now();
        if !session.can_refresh(now) {
            return Err(AuthError::RefreshTokenExpired);
        }

        let subject = TokenSubject {
            user_id: session.user_id,
            session_id: session.session_id,
            role,
        };
        // Access never outlives the session
        let access_expiry = (now + self.access_ttl).min(session.refresh_expires_at);
        let access = self
            .issuer
            .issue(subject, TokenType::Access, now, access_expiry)?;
        let refresh =
            self.issuer
                .issue(subject, TokenType::Refresh, now, session.refresh_expires_at)?;

        session.refresh_access_token(
            AccessToken::new(access.token.clone())?,
            access.expires_at(),
            now,
        )?;
        session.rotate_refresh_token(RefreshTokenValue::new(refresh.token.clone())?, now)?;
        session.touch(now);
        store.update_session(session).await?;

        tracing::info!(
            user_id = %session.user_id,
            session_id = %session.session_id,
            "Session tokens rotated"
        );

        Ok(TokenPair { access, refresh })
    }

    /// Idempotent; returns whether this call closed the session
    pub async fn invalidate<S: AuthStores>(
        &self,
        store: &S,
        session_id: &SessionId,
    ) -> AuthResult<bool> {
        let closed = store.invalidate_session(session_id, self.now()).await?;
        if closed {
            tracing::info!(session_id = %session_id, "Session invalidated");
        }
        Ok(closed)
    }

    /// Close every active session of `user_id` except `keep`
    pub async fn invalidate_all<S: AuthStores>(
        &self,
        store: &S,
        user_id: &UserId,
        keep: Option<SessionId>,
    ) -> AuthResult<u64> {
        let closed = store
            .invalidate_sessions_except(user_id, keep, self.now())
            .await?;
        tracing::info!(
            user_id = %user_id,
            kept = ?keep.map(|id| id.to_string()),
            closed,
            "Sessions invalidated"
        );
        Ok(closed)
    }

    pub async fn touch_activity<S: AuthStores>(
        &self,
        store: &S,
        session_id: &SessionId,
    ) -> AuthResult<()> {
        if store.touch_session(session_id, self.now()).await? {
            Ok(())
        } else {
            Err(AuthError::SessionNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::SessionRepository;
    use crate::test_support;
    use platform::clock::ManualClock;

    fn device() -> DeviceInfo {
        DeviceInfo::new(
            UserAgent::new("Mozilla/5.0"),
            IpAddress::parse("203.0.113.50").unwrap(),
        )
    }

    async fn setup() -> (
        crate::infra::memory::MemoryAuthStore,
        SessionLifecycleManager,
        Arc<ManualClock>,
        UserId,
    ) {
        let (store, hasher) = test_support::store_with_hasher();
        let user = test_support::seed_user(&store, &*hasher, "alice", "CorrectHorse9!").await;
        let clock = Arc::new(ManualClock::starting_now());
        let manager = SessionLifecycleManager::new(
            Arc::new(test_support::issuer()),
            clock.clone(),
            Duration::minutes(15),
        );
        (store, manager, clock, user.user_id)
    }

    #[tokio::test]
    async fn test_create_then_validate() {
        let (store, manager, _clock, user_id) = setup().await;
        let created = manager
            .create_session(&store, &user_id, &device(), Duration::days(7))
            .await
            .unwrap();

        let session = manager
            .validate_session(&store, &created.session.session_id)
            .await
            .unwrap();
        assert!(session.is_valid(manager.now()));
        assert!(session.matches_device(&device().fingerprint()));
        assert!(session.refresh_token.matches(&created.tokens.refresh.token));
        assert!(session.refresh_expires_at > session.access_expires_at);
    }

    #[tokio::test]
    async fn test_create_for_unknown_user() {
        let (store, manager, _clock, _) = setup().await;
        let result = manager
            .create_session(&store, &UserId::new(), &device(), Duration::days(7))
            .await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_validate_across_expiry() {
        let (store, manager, clock, user_id) = setup().await;
        let created = manager
            .create_session(&store, &user_id, &device(), Duration::days(7))
            .await
            .unwrap();
        let id = created.session.session_id;

        clock.advance(Duration::minutes(20));
        let session = manager.validate_session(&store, &id).await.unwrap();
        assert_eq!(session.state(manager.now()), SessionState::AccessExpired);

        clock.advance(Duration::days(7));
        assert!(matches!(
            manager.validate_session(&store, &id).await,
            Err(AuthError::SessionNotFound)
        ));
        assert!(matches!(
            manager.validate_session(&store, &SessionId::new()).await,
            Err(AuthError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn test_rotate_keeps_refresh_expiry() {
        let (store, manager, clock, user_id) = setup().await;
        let created = manager
            .create_session(&store, &user_id, &device(), Duration::days(7))
            .await
            .unwrap();
        let mut session = created.session.clone();
        let refresh_expiry = session.refresh_expires_at;

        clock.advance(Duration::minutes(30));
        let pair = manager
            .rotate(&store, &mut session, UserRole::User)
            .await
            .unwrap();

        let stored = store
            .find_session(&session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.refresh_expires_at, refresh_expiry);
        assert_eq!(pair.refresh.expires_at(), refresh_expiry);
        assert!(stored.refresh_token.matches(&pair.refresh.token));
        assert!(!stored.refresh_token.matches(&created.tokens.refresh.token));
        assert_eq!(stored.access_token.as_str(), pair.access.token);
        assert!(stored.is_valid(manager.now()));
    }

    #[tokio::test]
    async fn test_rotate_after_refresh_expiry() {
        let (store, manager, clock, user_id) = setup().await;
        let mut session = manager
            .create_session(&store, &user_id, &device(), Duration::days(7))
            .await
            .unwrap()
            .session;

        clock.advance(Duration::days(8));
        assert!(matches!(
            manager.rotate(&store, &mut session, UserRole::User).await,
            Err(AuthError::RefreshTokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_invalidate_is_idempotent() {
        let (store, manager, _clock, user_id) = setup().await;
        let id = manager
            .create_session(&store, &user_id, &device(), Duration::days(7))
            .await
            .unwrap()
            .session
            .session_id;

        assert!(manager.invalidate(&store, &id).await.unwrap());
        assert!(!manager.invalidate(&store, &id).await.unwrap());

        let stored = store.find_session(&id).await.unwrap().unwrap();
        assert_eq!(stored.state(manager.now()), SessionState::Invalidated);
    }

    #[tokio::test]
    async fn test_invalidate_all_keeps_one() {
        let (store, manager, _clock, user_id) = setup().await;
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(
                manager
                    .create_session(&store, &user_id, &device(), Duration::days(7))
                    .await
                    .unwrap()
                    .session
                    .session_id,
            );
        }

        let closed = manager
            .invalidate_all(&store, &user_id, Some(ids[0]))
            .await
            .unwrap();
        assert_eq!(closed, 2);
        assert!(manager.validate_session(&store, &ids[0]).await.is_ok());
        assert!(manager.validate_session(&store, &ids[1]).await.is_err());
    }

    #[tokio::test]
    async fn test_touch_activity() {
        let (store, manager, clock, user_id) = setup().await;
        let created = manager
            .create_session(&store, &user_id, &device(), Duration::days(7))
            .await
            .unwrap();
        let id = created.session.session_id;

        clock.advance(Duration::minutes(3));
        manager.touch_activity(&store, &id).await.unwrap();
        let stored = store.find_session(&id).await.unwrap().unwrap();
        assert_eq!(stored.last_activity_at, manager.now());
        assert_eq!(stored.access_expires_at, created.session.access_expires_at);

        assert!(matches!(
            manager.touch_activity(&store, &SessionId::new()).await,
            Err(AuthError::SessionNotFound)
        ));
    }
}
