//! Repository Traits
//!
//! One narrow store interface per aggregate. Implementations live in the
//! infrastructure layer; a transaction handle implements the same traits so
//! use cases are written once for both pooled and transactional access.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entity::{login_attempt::LoginAttempt, session::Session, user::User};
use crate::domain::value_object::{
    ip_address::IpAddress, session_id::SessionId, user_id::UserId, user_name::UserName,
    user_password::{RawPassword, UserPassword},
};
use crate::error::AuthResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Create a new user; fails on a duplicate user name
    async fn create_user(&self, user: &User) -> AuthResult<()>;

    async fn find_user_by_id(&self, user_id: &UserId) -> AuthResult<Option<User>>;

    async fn find_user_by_name(&self, user_name: &UserName) -> AuthResult<Option<User>>;

    /// Persist profile, password and status changes
    async fn update_user(&self, user: &User) -> AuthResult<()>;
}

/// Session repository trait
///
/// The refresh-token value is unique across all sessions.
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    async fn insert_session(&self, session: &Session) -> AuthResult<()>;

    /// Persist a refreshed or rotated session
    async fn update_session(&self, session: &Session) -> AuthResult<()>;

    async fn find_session(&self, session_id: &SessionId) -> AuthResult<Option<Session>>;

    /// Look up by current refresh value; inside a transaction the row is locked
    async fn find_session_by_refresh_token(&self, value: &str) -> AuthResult<Option<Session>>;

    /// Active, refresh-eligible sessions, most recent activity first
    async fn list_active_sessions(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
        page: PageRequest,
    ) -> AuthResult<Page<Session>>;

    /// Returns whether a still-active session was deactivated
    async fn invalidate_session(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> AuthResult<bool>;

    /// Deactivate every active session of `user_id` except `keep`
    async fn invalidate_sessions_except(
        &self,
        user_id: &UserId,
        keep: Option<SessionId>,
        now: DateTime<Utc>,
    ) -> AuthResult<u64>;

    /// Update last activity only
    async fn touch_session(&self, session_id: &SessionId, now: DateTime<Utc>)
    -> AuthResult<bool>;
}

/// Login attempt ledger
#[trait_variant::make(LoginAttemptRepository: Send)]
pub trait LocalLoginAttemptRepository {
    async fn append_attempt(&self, attempt: &LoginAttempt) -> AuthResult<()>;

    /// Failed attempts for the exact `(user_name, ip)` pair at or after `since`
    async fn count_failures_since(
        &self,
        user_name: &UserName,
        ip: &IpAddress,
        since: DateTime<Utc>,
    ) -> AuthResult<u64>;
}

/// Everything a unit of work can touch
pub trait AuthStores: UserRepository + SessionRepository + LoginAttemptRepository + Sync {}

impl<T> AuthStores for T where T: UserRepository + SessionRepository + LoginAttemptRepository + Sync {}

/// Password hashing contract
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, raw: &RawPassword) -> AuthResult<UserPassword>;

    fn verify(&self, raw: &RawPassword, hashed: &UserPassword) -> bool;

    /// Stored hash uses an outdated algorithm or cost
    fn needs_rehash(&self, hashed: &UserPassword) -> bool;
}

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub offset: u32,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: u32 = 20;

    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Force `limit` into `1..=max`
    pub fn clamped(self, max: u32) -> Self {
        Self {
            limit: self.limit.clamp(1, max.max(1)),
            offset: self.offset,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching rows, ignoring limit/offset
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            limit: request.limit,
            offset: request.offset,
        }
    }

    pub fn has_more(&self) -> bool {
        u64::from(self.offset) + (self.items.len() as u64) < self.total
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}
