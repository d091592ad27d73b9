//! User Profile Use Case

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::AuthBackend;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{user_id::UserId, user_role::UserRole, user_status::UserStatus};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            display_name: user.full_name(),
            user_id: user.user_id,
            user_name: user.user_name.into_inner(),
            email: user.email.into_db(),
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.user_role,
            status: user.user_status,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

pub struct UserProfileUseCase<B: AuthBackend> {
    store: Arc<B>,
}

impl<B: AuthBackend> UserProfileUseCase<B> {
    pub fn new(store: Arc<B>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, user_id: UserId) -> AuthResult<UserProfile> {
        self.store
            .find_user_by_id(&user_id)
            .await?
            .map(UserProfile::from)
            .ok_or(AuthError::UserNotFound)
    }
}
