//! Logout and session revocation
//!
//! A user may close only sessions they own. Closing runs in a transaction so
//! the ownership check and the invalidation see the same row.

use tokio_util::sync::CancellationToken;

use crate::application::AuthBackend;
use crate::application::session_lifecycle::SessionLifecycleManager;
use crate::application::transaction::TransactionCoordinator;
use crate::domain::value_object::{session_id::SessionId, user_id::UserId};
use crate::error::{AuthError, AuthResult};

/// Logout use case
pub struct LogoutUseCase<B: AuthBackend> {
    coordinator: TransactionCoordinator<B>,
    sessions: SessionLifecycleManager,
}

impl<B: AuthBackend> LogoutUseCase<B> {
    pub fn new(coordinator: TransactionCoordinator<B>, sessions: SessionLifecycleManager) -> Self {
        Self {
            coordinator,
            sessions,
        }
    }

    /// Close the caller's current session
    pub async fn execute(
        &self,
        user_id: UserId,
        session_id: SessionId,
        cancel: &CancellationToken,
    ) -> AuthResult<()> {
        close_owned_session(
            &self.coordinator,
            &self.sessions,
            user_id,
            session_id,
            "SESSION_INVALIDATE_FAILED",
            cancel,
        )
        .await?;
        tracing::info!(user_id = %user_id, session_id = %session_id, "User logged out");
        Ok(())
    }
}

/// Revoke one or all sessions of a user
pub struct RevokeSessionsUseCase<B: AuthBackend> {
    coordinator: TransactionCoordinator<B>,
    sessions: SessionLifecycleManager,
}

impl<B: AuthBackend> RevokeSessionsUseCase<B> {
    pub fn new(coordinator: TransactionCoordinator<B>, sessions: SessionLifecycleManager) -> Self {
        Self {
            coordinator,
            sessions,
        }
    }

    /// Close one session, typically on another device
    pub async fn revoke(
        &self,
        user_id: UserId,
        session_id: SessionId,
        cancel: &CancellationToken,
    ) -> AuthResult<()> {
        close_owned_session(
            &self.coordinator,
            &self.sessions,
            user_id,
            session_id,
            "SESSION_REVOKE_FAILED",
            cancel,
        )
        .await
    }

    /// Close every session of `user_id` except `keep`; returns how many closed
    pub async fn revoke_all(
        &self,
        user_id: UserId,
        keep: Option<SessionId>,
        cancel: &CancellationToken,
    ) -> AuthResult<u64> {
        let sessions = self.sessions.clone();
        self.coordinator
            .execute(cancel, move |uow| {
                Box::pin(async move { sessions.invalidate_all(uow.tx(), &user_id, keep).await })
            })
            .await
            .map_err(|e| e.rolled_back_if_system("SESSION_REVOKE_FAILED"))
    }
}

async fn close_owned_session<B: AuthBackend>(
    coordinator: &TransactionCoordinator<B>,
    sessions: &SessionLifecycleManager,
    user_id: UserId,
    session_id: SessionId,
    failure_code: &'static str,
    cancel: &CancellationToken,
) -> AuthResult<()> {
    let sessions = sessions.clone();
    coordinator
        .execute(cancel, move |uow| {
            Box::pin(async move {
                let session = sessions
                    .validate_session(uow.tx(), &session_id)
                    .await
                    .map_err(|e| match e {
                        AuthError::SessionNotFound => AuthError::InvalidSession,
                        other => other,
                    })?;
                if session.user_id != user_id {
                    return Err(AuthError::SessionUserMismatch);
                }
                sessions.invalidate(uow.tx(), &session_id).await?;
                Ok(())
            })
        })
        .await
        .map_err(|e| e.rolled_back_if_system(failure_code))
}
