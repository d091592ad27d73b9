//! List Sessions Use Case

use std::sync::Arc;

use crate::application::AuthBackend;
use crate::application::session_lifecycle::SessionLifecycleManager;
use crate::domain::entity::session::SessionSummary;
use crate::domain::repository::{Page, PageRequest, SessionRepository};
use crate::domain::value_object::{session_id::SessionId, user_id::UserId};
use crate::error::AuthResult;

/// Active sessions of a user, newest activity first
pub struct ListSessionsUseCase<B: AuthBackend> {
    store: Arc<B>,
    sessions: SessionLifecycleManager,
    max_page_size: u32,
}

impl<B: AuthBackend> ListSessionsUseCase<B> {
    pub fn new(store: Arc<B>, sessions: SessionLifecycleManager, max_page_size: u32) -> Self {
        Self {
            store,
            sessions,
            max_page_size,
        }
    }

    /// `current` marks the caller's own session in the result
    pub async fn execute(
        &self,
        user_id: UserId,
        current: Option<SessionId>,
        page: PageRequest,
    ) -> AuthResult<Page<SessionSummary>> {
        let page = page.clamped(self.max_page_size);
        let sessions = self
            .store
            .list_active_sessions(&user_id, self.sessions.now(), page)
            .await?;

        Ok(sessions.map(|s| SessionSummary::from_session(&s, current)))
    }
}
