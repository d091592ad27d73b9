//! In-memory store
//!
//! Backs tests and local tooling. A transaction is a private snapshot of the
//! whole state; commit publishes it back only if nothing else was committed
//! in between, otherwise it reports a [`AuthError::TransactionConflict`] the
//! same way a serializable Postgres transaction would.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::application::transaction::{TransactionBackend, TxOptions};
use crate::domain::entity::{login_attempt::LoginAttempt, session::Session, user::User};
use crate::domain::repository::{
    LoginAttemptRepository, Page, PageRequest, SessionRepository, UserRepository,
};
use crate::domain::value_object::{
    ip_address::IpAddress, session_id::SessionId, user_id::UserId, user_name::UserName,
};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<UserId, User>,
    sessions: HashMap<SessionId, Session>,
    attempts: Vec<LoginAttempt>,
    /// Bumped on every write
    version: u64,
}

/// Switchable failures for exercising rollback and retry paths
#[derive(Debug, Default)]
pub struct Faults {
    session_inserts: AtomicBool,
    attempt_appends: AtomicBool,
    commit_conflicts: AtomicU32,
}

impl Faults {
    pub fn fail_session_inserts(&self, on: bool) {
        self.session_inserts.store(on, Ordering::SeqCst);
    }

    pub fn fail_attempt_appends(&self, on: bool) {
        self.attempt_appends.store(on, Ordering::SeqCst);
    }

    /// The next `n` commits fail with a conflict
    pub fn inject_commit_conflicts(&self, n: u32) {
        self.commit_conflicts.store(n, Ordering::SeqCst);
    }

    fn take_commit_conflict(&self) -> bool {
        self.commit_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAuthStore {
    state: Arc<RwLock<MemoryState>>,
    faults: Arc<Faults>,
    /// Parent version this snapshot was taken from; `None` outside a transaction
    base_version: Option<u64>,
    read_only: bool,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    pub async fn attempt_count(&self) -> usize {
        self.state.read().await.attempts.len()
    }

    pub async fn attempts(&self) -> Vec<LoginAttempt> {
        self.state.read().await.attempts.clone()
    }

    /// Delete a user outright; returns whether it existed
    pub async fn remove_user(&self, user_id: &UserId) -> bool {
        let mut state = self.state.write().await;
        state.version += 1;
        state.users.remove(user_id).is_some()
    }

    /// Delete sessions whose refresh window closed before `now`
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> u64 {
        let mut state = self.state.write().await;
        state.version += 1;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.refresh_expires_at > now);
        (before - state.sessions.len()) as u64
    }

    pub async fn purge_attempts_before(&self, cutoff: DateTime<Utc>) -> u64 {
        let mut state = self.state.write().await;
        state.version += 1;
        let before = state.attempts.len();
        state.attempts.retain(|a| a.attempted_at >= cutoff);
        (before - state.attempts.len()) as u64
    }

    async fn write(&self) -> AuthResult<RwLockWriteGuard<'_, MemoryState>> {
        if self.read_only {
            return Err(AuthError::Internal(
                "write attempted in a read-only transaction".into(),
            ));
        }
        let mut state = self.state.write().await;
        state.version += 1;
        Ok(state)
    }
}

fn refresh_token_taken(state: &MemoryState, session: &Session) -> bool {
    state.sessions.values().any(|other| {
        other.session_id != session.session_id
            && other.refresh_token.as_str() == session.refresh_token.as_str()
    })
}

// ============================================================================
// Transactions
// ============================================================================

impl TransactionBackend for MemoryAuthStore {
    type Tx = MemoryAuthStore;

    async fn begin(&self, options: TxOptions) -> AuthResult<Self::Tx> {
        let snapshot = self.state.read().await.clone();
        Ok(MemoryAuthStore {
            base_version: Some(snapshot.version),
            state: Arc::new(RwLock::new(snapshot)),
            faults: Arc::clone(&self.faults),
            read_only: options.read_only,
        })
    }

    async fn commit(&self, tx: Self::Tx) -> AuthResult<()> {
        if self.faults.take_commit_conflict() {
            return Err(AuthError::TransactionConflict(
                "could not serialize access due to concurrent update".into(),
            ));
        }
        if tx.read_only {
            return Ok(());
        }

        let snapshot = tx.state.read().await.clone();
        let mut state = self.state.write().await;
        if tx.base_version != Some(state.version) {
            return Err(AuthError::TransactionConflict(
                "state changed since the transaction began".into(),
            ));
        }
        let version = state.version + 1;
        *state = snapshot;
        state.version = version;
        Ok(())
    }

    async fn rollback(&self, _tx: Self::Tx) -> AuthResult<()> {
        Ok(())
    }
}

// ============================================================================
// Users
// ============================================================================

impl UserRepository for MemoryAuthStore {
    async fn create_user(&self, user: &User) -> AuthResult<()> {
        let mut state = self.write().await?;
        let duplicate = state.users.contains_key(&user.user_id)
            || state
                .users
                .values()
                .any(|u| u.user_name.as_str() == user.user_name.as_str());
        if duplicate {
            return Err(AuthError::Internal(format!(
                "duplicate user name: {}",
                user.user_name.as_str()
            )));
        }
        state.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>> {
        Ok(self.state.read().await.users.get(user_id).cloned())
    }

    async fn find_user_by_name(&self, user_name: &UserName) -> AuthResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.user_name.as_str() == user_name.as_str())
            .cloned())
    }

    async fn update_user(&self, user: &User) -> AuthResult<()> {
        let mut state = self.write().await?;
        match state.users.get_mut(&user.user_id) {
            Some(stored) => {
                *stored = user.clone();
                Ok(())
            }
            None => Err(AuthError::UserNotFound),
        }
    }
}

// ============================================================================
// Sessions
// ============================================================================

impl SessionRepository for MemoryAuthStore {
    async fn insert_session(&self, session: &Session) -> AuthResult<()> {
        if self.faults.session_inserts.load(Ordering::SeqCst) {
            return Err(AuthError::Internal("session insert failed".into()));
        }
        let mut state = self.write().await?;
        if state.sessions.contains_key(&session.session_id) || refresh_token_taken(&state, session)
        {
            return Err(AuthError::Internal("duplicate session".into()));
        }
        state.sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn update_session(&self, session: &Session) -> AuthResult<()> {
        let mut state = self.write().await?;
        if refresh_token_taken(&state, session) {
            return Err(AuthError::Internal("duplicate refresh token".into()));
        }
        match state.sessions.get_mut(&session.session_id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(AuthError::SessionNotFound),
        }
    }

    async fn find_session(&self, session_id: &SessionId) -> AuthResult<Option<Session>> {
        Ok(self.state.read().await.sessions.get(session_id).cloned())
    }

    async fn find_session_by_refresh_token(&self, value: &str) -> AuthResult<Option<Session>> {
        let state = self.state.read().await;
        Ok(state
            .sessions
            .values()
            .find(|s| s.refresh_token.as_str() == value)
            .cloned())
    }

    async fn list_active_sessions(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> AuthResult<Page<Session>> {
        let state = self.state.read().await;
        let mut sessions: Vec<&Session> = state
            .sessions
            .values()
            .filter(|s| s.user_id == *user_id && s.is_active && s.refresh_expires_at > now)
            .collect();
        sessions.sort_by(|a, b| {
            b.last_activity_at
                .cmp(&a.last_activity_at)
                .then(b.created_at.cmp(&a.created_at))
        });

        let total = sessions.len() as u64;
        let items = sessions
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total, page))
    }

    async fn invalidate_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let mut state = self.write().await?;
        Ok(state
            .sessions
            .get_mut(session_id)
            .is_some_and(|s| s.deactivate(now)))
    }

    async fn invalidate_sessions_except(
        &self,
        user_id: &UserId,
        keep: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let mut state = self.write().await?;
        let mut count = 0;
        for session in state.sessions.values_mut() {
            if session.user_id != *user_id || Some(session.session_id) == keep {
                continue;
            }
            if session.deactivate(now) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn touch_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> AuthResult<bool> {
        let mut state = self.write().await?;
        match state.sessions.get_mut(session_id) {
            Some(session) => {
                session.touch(now);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

// ============================================================================
// Login attempts
// ============================================================================

impl LoginAttemptRepository for MemoryAuthStore {
    async fn append_attempt(&self, attempt: &LoginAttempt) -> AuthResult<()> {
        if self.faults.attempt_appends.load(Ordering::SeqCst) {
            return Err(AuthError::Internal("login attempt append failed".into()));
        }
        self.write().await?.attempts.push(attempt.clone());
        Ok(())
    }

    async fn count_failures_since(
        &self,
        user_name: &UserName,
        ip: &IpAddress,
        since: DateTime<Utc>,
    ) -> AuthResult<u64> {
        let state = self.state.read().await;
        let count = state
            .attempts
            .iter()
            .filter(|a| {
                !a.success
                    && a.attempted_at >= since
                    && a.user_name.as_str() == user_name.as_str()
                    && a.ip_address == *ip
            })
            .count();
        Ok(count as u64)
    }
}
