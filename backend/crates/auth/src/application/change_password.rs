//! Change Password Use Case
//!
//! The new password is policy-checked and hashed before any transaction
//! opens. Verifying the old password, storing the new hash and closing the
//! user's other sessions then commit or roll back together.

use std::sync::Arc;

use kernel::error::app_error::AppError;
use tokio_util::sync::CancellationToken;

use crate::application::AuthBackend;
use crate::application::config::AuthConfig;
use crate::application::session_lifecycle::SessionLifecycleManager;
use crate::application::transaction::TransactionCoordinator;
use crate::domain::repository::{PasswordHasher, UserRepository};
use crate::domain::value_object::{
    session_id::SessionId, user_id::UserId, user_password::RawPassword,
};
use crate::error::{AuthError, AuthResult};

pub struct ChangePasswordInput {
    pub user_id: UserId,
    /// Session making the request; it stays open
    pub current_session: Option<SessionId>,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordChanged {
    pub sessions_revoked: u64,
}

pub struct ChangePasswordUseCase<B: AuthBackend> {
    coordinator: TransactionCoordinator<B>,
    sessions: SessionLifecycleManager,
    hasher: Arc<dyn PasswordHasher>,
    config: Arc<AuthConfig>,
}

impl<B: AuthBackend> ChangePasswordUseCase<B> {
    pub fn new(
        coordinator: TransactionCoordinator<B>,
        sessions: SessionLifecycleManager,
        hasher: Arc<dyn PasswordHasher>,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            coordinator,
            sessions,
            hasher,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: ChangePasswordInput,
        cancel: &CancellationToken,
    ) -> AuthResult<PasswordChanged> {
        let new_password = RawPassword::new(input.new_password, &self.config.password_policy)?;
        let old_password = RawPassword::candidate(input.old_password)?;
        let new_hash = self.hasher.hash(&new_password)?;

        let user_id = input.user_id;
        let current_session = input.current_session;
        let sessions = self.sessions.clone();
        let hasher = Arc::clone(&self.hasher);

        let revoked = self
            .coordinator
            .execute(cancel, move |uow| {
                Box::pin(async move {
                    let mut user = uow
                        .tx()
                        .find_user_by_id(&user_id)
                        .await?
                        .ok_or(AuthError::UserNotFound)?;

                    if !hasher.verify(&old_password, &user.password) {
                        tracing::warn!(user_id = %user_id, "Password change with wrong current password");
                        return Err(AuthError::InvalidCredentials);
                    }
                    if hasher.verify(&new_password, &user.password) {
                        return Err(AppError::bad_request("New password must differ from the current one")
                            .with_code("PASSWORD_REUSED")
                            .with_action("Please choose a different password")
                            .into());
                    }

                    user.change_password(new_hash, sessions.now());
                    uow.tx().update_user(&user).await?;
                    sessions
                        .invalidate_all(uow.tx(), &user_id, current_session)
                        .await
                })
            })
            .await
            .map_err(|e| e.rolled_back_if_system("PASSWORD_CHANGE_FAILED"))?;

        tracing::info!(user_id = %user_id, sessions_revoked = revoked, "Password changed");
        Ok(PasswordChanged {
            sessions_revoked: revoked,
        })
    }
}
