//! Login Use Case
//!
//! Throttle check, credential check and status check run against the pooled
//! store. Session creation, token minting and the success record then share
//! one unit of work, so a failure leaves no session behind.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::error::app_error::AppError;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::application::AuthBackend;
use crate::application::config::AuthConfig;
use crate::application::credentials::CredentialValidator;
use crate::application::session_lifecycle::{DeviceInfo, SessionLifecycleManager};
use crate::application::throttle::ThrottleLedger;
use crate::application::transaction::TransactionCoordinator;
use crate::domain::entity::login_attempt::{FailureReason, LoginAttempt};
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    session_id::SessionId, user_id::UserId, user_name::UserName, user_password::RawPassword,
    user_role::UserRole, user_status::UserStatus,
};
use crate::error::{AuthError, AuthResult};

/// Login input
pub struct LoginInput {
    pub user_name: String,
    pub password: String,
    pub device: DeviceInfo,
    /// Use the long refresh lifetime
    pub remember_me: bool,
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.user_id,
            user_name: user.user_name.as_str().to_string(),
            email: user.email.as_str().to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.user_role,
            status: user.user_status,
        }
    }
}

/// Login output
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutput {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub session_id: SessionId,
    pub user: UserInfo,
}

/// Login use case
pub struct LoginUseCase<B: AuthBackend> {
    store: Arc<B>,
    coordinator: TransactionCoordinator<B>,
    sessions: SessionLifecycleManager,
    throttle: ThrottleLedger,
    credentials: CredentialValidator,
    config: Arc<AuthConfig>,
}

impl<B: AuthBackend> LoginUseCase<B> {
    pub fn new(
        store: Arc<B>,
        coordinator: TransactionCoordinator<B>,
        sessions: SessionLifecycleManager,
        throttle: ThrottleLedger,
        credentials: CredentialValidator,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            store,
            coordinator,
            sessions,
            throttle,
            credentials,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: LoginInput,
        cancel: &CancellationToken,
    ) -> AuthResult<LoginOutput> {
        let user_name = UserName::new(&input.user_name).map_err(AppError::from)?;
        let password = RawPassword::candidate(input.password)?;
        let device = input.device;
        let now = self.sessions.now();

        // 1. Throttle
        if let Err(e) = self
            .throttle
            .check(&*self.store, &user_name, &device.ip_address, now)
            .await
        {
            if matches!(e, AuthError::AccountLocked) {
                self.record_failure(&user_name, &device, FailureReason::RateLimited, now)
                    .await;
            }
            return Err(e);
        }

        // 2. Credentials
        let Some(user) = self
            .credentials
            .validate(&*self.store, &user_name, &password)
            .await?
        else {
            self.record_failure(&user_name, &device, FailureReason::InvalidCredentials, now)
                .await;
            return Err(AuthError::InvalidCredentials);
        };

        // 3. Status
        if !user.can_login() {
            tracing::warn!(
                user_id = %user.user_id,
                status = user.user_status.code(),
                "Login refused for disabled account"
            );
            self.record_failure(&user_name, &device, FailureReason::AccountDisabled, now)
                .await;
            return Err(AuthError::AccountLocked);
        }

        // Old cost parameters are upgraded while the plaintext is at hand
        let rehashed = if self.credentials.hasher().needs_rehash(&user.password) {
            match self.credentials.hasher().hash(&password) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    tracing::warn!(user_id = %user.user_id, error = %e, "Password rehash failed");
                    None
                }
            }
        } else {
            None
        };

        // 4. One unit of work
        let sessions = self.sessions.clone();
        let throttle = self.throttle.clone();
        let refresh_ttl = self.config.refresh_ttl(input.remember_me);
        let attempt = LoginAttempt::succeeded(
            user_name,
            device.ip_address,
            device.user_agent.clone(),
            now,
        );
        let mut user = user;
        let user_id = user.user_id;

        let (created, user) = self
            .coordinator
            .execute(cancel, move |uow| {
                Box::pin(async move {
                    let created = sessions
                        .create_session(uow.tx(), &user_id, &device, refresh_ttl)
                        .await?;

                    if let Some(hash) = rehashed {
                        user.change_password(hash, now);
                        tracing::info!(user_id = %user_id, "Password hash upgraded");
                    }
                    user.record_login(now);
                    uow.tx().update_user(&user).await?;
                    throttle.record(uow.tx(), &attempt).await;

                    let session_id = created.session.session_id;
                    uow.on_commit(move || {
                        tracing::info!(user_id = %user_id, session_id = %session_id, "Login succeeded");
                        Ok(())
                    });
                    uow.on_rollback(move || {
                        tracing::warn!(user_id = %user_id, "Login rolled back");
                        Ok(())
                    });

                    Ok((created, user))
                })
            })
            .await
            .map_err(|e| AuthError::rolled_back("LOGIN_FAILED", e))?;

        Ok(LoginOutput {
            access_token: created.tokens.access.token,
            refresh_token: created.tokens.refresh.token,
            expires_at: created.session.access_expires_at,
            refresh_expires_at: created.session.refresh_expires_at,
            session_id: created.session.session_id,
            user: UserInfo::from(&user),
        })
    }

    async fn record_failure(
        &self,
        user_name: &UserName,
        device: &DeviceInfo,
        reason: FailureReason,
        now: DateTime<Utc>,
    ) {
        let attempt = LoginAttempt::failed(
            user_name.clone(),
            device.ip_address,
            device.user_agent.clone(),
            reason,
            now,
        );
        self.throttle.record(&*self.store, &attempt).await;
    }
}
