//! Validate Token Use Case
//!
//! The gate in front of every protected call. A correctly signed access
//! token is accepted only while its session is still usable.

use std::sync::Arc;

use serde::Serialize;

use crate::application::AuthBackend;
use crate::application::session_lifecycle::SessionLifecycleManager;
use crate::domain::entity::token_claims::TokenClaims;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::access_token::AccessToken;
use crate::error::{AuthError, AuthResult};

/// Verified caller identity
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub claims: TokenClaims,
    pub user_name: String,
    pub email: String,
}

pub struct ValidateTokenUseCase<B: AuthBackend> {
    store: Arc<B>,
    sessions: SessionLifecycleManager,
}

impl<B: AuthBackend> ValidateTokenUseCase<B> {
    pub fn new(store: Arc<B>, sessions: SessionLifecycleManager) -> Self {
        Self { store, sessions }
    }

    /// `TokenExpired` means the client should refresh; anything else is final
    pub async fn execute(&self, token: &str) -> AuthResult<Principal> {
        let token = AccessToken::new(token).map_err(|_| AuthError::TokenInvalid)?;
        let claims = self
            .sessions
            .issuer()
            .validate_access(token.as_str(), self.sessions.now())?;

        let user = self
            .store
            .find_user_by_id(&claims.user_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        let session = self
            .sessions
            .validate_session(&*self.store, &claims.session_id)
            .await
            .map_err(|e| match e {
                AuthError::SessionNotFound => AuthError::InvalidSession,
                other => other,
            })?;
        if session.user_id != claims.user_id {
            tracing::warn!(
                session_id = %claims.session_id,
                user_id = %claims.user_id,
                "Token names a session of another user"
            );
            return Err(AuthError::InvalidSession);
        }

        Ok(Principal {
            claims,
            user_name: user.user_name.into_inner(),
            email: user.email.into_db(),
        })
    }
}
