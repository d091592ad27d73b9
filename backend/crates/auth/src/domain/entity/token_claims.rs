//! Verified token claims
//!
//! Never persisted. Whether the backing session is still alive is checked
//! separately on every use.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_object::{
    session_id::SessionId, token_type::TokenType, user_id::UserId, user_role::UserRole,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenClaims {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub role: UserRole,
    pub token_type: TokenType,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Unique per issuance
    pub token_id: Uuid,
}

impl TokenClaims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
