//! Refresh Token Use Case
//!
//! Every refresh is a full rotation: the presented refresh value is spent
//! and a new pair is returned. Runs as a retryable transaction so two
//! concurrent refreshes of one session serialize; the loser finds the value
//! already rotated and is rejected.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::application::AuthBackend;
use crate::application::login::UserInfo;
use crate::application::session_lifecycle::{DeviceInfo, SessionLifecycleManager};
use crate::application::transaction::TransactionCoordinator;
use crate::domain::repository::{SessionRepository, UserRepository};
use crate::domain::value_object::{refresh_token::RefreshTokenValue, session_id::SessionId};
use crate::error::{AuthError, AuthResult};

pub struct RefreshTokenInput {
    pub refresh_token: String,
    pub device: DeviceInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshTokenOutput {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    /// Unchanged by rotation
    pub refresh_expires_at: DateTime<Utc>,
    pub session_id: SessionId,
    pub user: UserInfo,
}

pub struct RefreshTokenUseCase<B: AuthBackend> {
    coordinator: TransactionCoordinator<B>,
    sessions: SessionLifecycleManager,
}

impl<B: AuthBackend> RefreshTokenUseCase<B> {
    pub fn new(coordinator: TransactionCoordinator<B>, sessions: SessionLifecycleManager) -> Self {
        Self {
            coordinator,
            sessions,
        }
    }

    pub async fn execute(
        &self,
        input: RefreshTokenInput,
        cancel: &CancellationToken,
    ) -> AuthResult<RefreshTokenOutput> {
        let presented = RefreshTokenValue::new(input.refresh_token)?;
        let claims = self
            .sessions
            .issuer()
            .validate_refresh(presented.as_str(), self.sessions.now())
            .map_err(|e| match e {
                AuthError::TokenExpired => AuthError::RefreshTokenExpired,
                other => other,
            })?;

        let presented = Arc::new(presented);
        let device = Arc::new(input.device);
        let sessions = self.sessions.clone();

        self.coordinator
            .execute_retryable(cancel, move |uow| {
                let presented = Arc::clone(&presented);
                let device = Arc::clone(&device);
                let sessions = sessions.clone();
                let claims = claims.clone();

                Box::pin(async move {
                    let tx = uow.tx();
                    let mut session = tx
                        .find_session_by_refresh_token(presented.as_str())
                        .await?
                        .ok_or(AuthError::InvalidSession)?;

                    if session.session_id != claims.session_id
                        || session.user_id != claims.user_id
                        || !session.refresh_token.matches(presented.as_str())
                    {
                        tracing::warn!(session_id = %claims.session_id, "Refresh token does not match its session");
                        return Err(AuthError::InvalidSession);
                    }
                    if !session.is_active {
                        return Err(AuthError::InvalidSession);
                    }

                    let user = tx
                        .find_user_by_id(&session.user_id)
                        .await?
                        .ok_or(AuthError::UserNotFound)?;
                    if !user.can_login() {
                        return Err(AuthError::AccountLocked);
                    }

                    if !session.matches_device(&device.fingerprint()) {
                        tracing::warn!(
                            session_id = %session.session_id,
                            ip = %device.ip_address,
                            "Refresh from a different device"
                        );
                    }

                    let tokens = sessions.rotate(tx, &mut session, user.user_role).await?;

                    Ok(RefreshTokenOutput {
                        access_token: tokens.access.token,
                        refresh_token: tokens.refresh.token,
                        expires_at: session.access_expires_at,
                        refresh_expires_at: session.refresh_expires_at,
                        session_id: session.session_id,
                        user: UserInfo::from(&user),
                    })
                })
            })
            .await
            .map_err(|e| e.rolled_back_if_system("TOKEN_REFRESH_FAILED"))
    }
}
