//! Auth Service
//!
//! Facade the transport layer talks to. Builds every use case from one
//! configuration and logs failures once, at this boundary.

use std::sync::Arc;

use platform::clock::Clock;
use tokio_util::sync::CancellationToken;

use crate::application::AuthBackend;
use crate::application::change_password::{
    ChangePasswordInput, ChangePasswordUseCase, PasswordChanged,
};
use crate::application::config::AuthConfig;
use crate::application::credentials::CredentialValidator;
use crate::application::list_sessions::ListSessionsUseCase;
use crate::application::login::{LoginInput, LoginOutput, LoginUseCase};
use crate::application::logout::{LogoutUseCase, RevokeSessionsUseCase};
use crate::application::refresh_token::{
    RefreshTokenInput, RefreshTokenOutput, RefreshTokenUseCase,
};
use crate::application::session_lifecycle::SessionLifecycleManager;
use crate::application::throttle::ThrottleLedger;
use crate::application::token_issuer::TokenIssuer;
use crate::application::transaction::TransactionCoordinator;
use crate::application::user_profile::{UserProfile, UserProfileUseCase};
use crate::application::validate_token::{Principal, ValidateTokenUseCase};
use crate::domain::entity::session::SessionSummary;
use crate::domain::repository::{Page, PageRequest, PasswordHasher};
use crate::domain::value_object::{session_id::SessionId, user_id::UserId};
use crate::error::{AuthError, AuthResult};
use crate::infra::password_hasher::Argon2PasswordHasher;

pub struct AuthService<B: AuthBackend> {
    store: Arc<B>,
    coordinator: TransactionCoordinator<B>,
    sessions: SessionLifecycleManager,
    login: LoginUseCase<B>,
    refresh: RefreshTokenUseCase<B>,
    logout: LogoutUseCase<B>,
    revoke: RevokeSessionsUseCase<B>,
    list_sessions: ListSessionsUseCase<B>,
    change_password: ChangePasswordUseCase<B>,
    validate_token: ValidateTokenUseCase<B>,
    user_profile: UserProfileUseCase<B>,
}

impl<B: AuthBackend> AuthService<B> {
    pub fn new(
        store: Arc<B>,
        config: AuthConfig,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        let config = Arc::new(config);
        let issuer = Arc::new(TokenIssuer::new(&config)?);
        let sessions = SessionLifecycleManager::new(issuer, clock, config.access_token_ttl);
        let coordinator = TransactionCoordinator::new(
            Arc::clone(&store),
            config.max_transaction_retries,
            config.batch_size,
        );
        let throttle = ThrottleLedger::new(config.login_throttle.clone());
        let credentials = CredentialValidator::new(Arc::clone(&hasher));

        tracing::info!(
            issuer = %config.jwt_issuer,
            access_ttl_secs = config.access_token_ttl.num_seconds(),
            refresh_ttl_secs = config.refresh_token_ttl.num_seconds(),
            max_retries = config.max_transaction_retries,
            "Auth service initialized"
        );

        Ok(Self {
            login: LoginUseCase::new(
                Arc::clone(&store),
                coordinator.clone(),
                sessions.clone(),
                throttle,
                credentials,
                Arc::clone(&config),
            ),
            refresh: RefreshTokenUseCase::new(coordinator.clone(), sessions.clone()),
            logout: LogoutUseCase::new(coordinator.clone(), sessions.clone()),
            revoke: RevokeSessionsUseCase::new(coordinator.clone(), sessions.clone()),
            list_sessions: ListSessionsUseCase::new(
                Arc::clone(&store),
                sessions.clone(),
                config.session_page_limit,
            ),
            change_password: ChangePasswordUseCase::new(
                coordinator.clone(),
                sessions.clone(),
                hasher,
                Arc::clone(&config),
            ),
            validate_token: ValidateTokenUseCase::new(Arc::clone(&store), sessions.clone()),
            user_profile: UserProfileUseCase::new(Arc::clone(&store)),
            store,
            coordinator,
            sessions,
        })
    }

    /// Same as [`AuthService::new`] with the Argon2id hasher from `config`
    pub fn with_argon2(store: Arc<B>, config: AuthConfig, clock: Arc<dyn Clock>) -> AuthResult<Self> {
        let hasher = Argon2PasswordHasher::new(
            config.password_hashing,
            config.password_pepper.clone(),
        )?;
        Self::new(store, config, Arc::new(hasher), clock)
    }

    pub fn coordinator(&self) -> &TransactionCoordinator<B> {
        &self.coordinator
    }

    pub fn sessions(&self) -> &SessionLifecycleManager {
        &self.sessions
    }

    pub async fn login(
        &self,
        input: LoginInput,
        cancel: &CancellationToken,
    ) -> AuthResult<LoginOutput> {
        self.login
            .execute(input, cancel)
            .await
            .inspect_err(AuthError::log)
    }

    pub async fn refresh_token(
        &self,
        input: RefreshTokenInput,
        cancel: &CancellationToken,
    ) -> AuthResult<RefreshTokenOutput> {
        self.refresh
            .execute(input, cancel)
            .await
            .inspect_err(AuthError::log)
    }

    pub async fn logout(
        &self,
        user_id: UserId,
        session_id: SessionId,
        cancel: &CancellationToken,
    ) -> AuthResult<()> {
        self.logout
            .execute(user_id, session_id, cancel)
            .await
            .inspect_err(AuthError::log)
    }

    pub async fn get_user_sessions(
        &self,
        user_id: UserId,
        current: Option<SessionId>,
        page: PageRequest,
    ) -> AuthResult<Page<SessionSummary>> {
        self.list_sessions
            .execute(user_id, current, page)
            .await
            .inspect_err(AuthError::log)
    }

    pub async fn revoke_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        cancel: &CancellationToken,
    ) -> AuthResult<()> {
        self.revoke
            .revoke(user_id, session_id, cancel)
            .await
            .inspect_err(AuthError::log)
    }

    pub async fn revoke_all_sessions(
        &self,
        user_id: UserId,
        keep: Option<SessionId>,
        cancel: &CancellationToken,
    ) -> AuthResult<u64> {
        self.revoke
            .revoke_all(user_id, keep, cancel)
            .await
            .inspect_err(AuthError::log)
    }

    pub async fn change_password(
        &self,
        input: ChangePasswordInput,
        cancel: &CancellationToken,
    ) -> AuthResult<PasswordChanged> {
        self.change_password
            .execute(input, cancel)
            .await
            .inspect_err(AuthError::log)
    }

    pub async fn validate_token(&self, token: &str) -> AuthResult<Principal> {
        self.validate_token
            .execute(token)
            .await
            .inspect_err(AuthError::log)
    }

    pub async fn get_user_profile(&self, user_id: UserId) -> AuthResult<UserProfile> {
        self.user_profile
            .execute(user_id)
            .await
            .inspect_err(AuthError::log)
    }

    /// Record activity on a session without touching its expiry
    pub async fn touch_session(&self, session_id: SessionId) -> AuthResult<()> {
        self.sessions
            .touch_activity(&*self.store, &session_id)
            .await
            .inspect_err(AuthError::log)
    }
}
