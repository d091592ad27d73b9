//! User Entity
//!
//! Identity plus credentials. Users are never deleted here; they move
//! between statuses.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{
    email::Email, user_id::UserId, user_name::UserName, user_password::UserPassword,
    user_role::UserRole, user_status::UserStatus,
};

/// User entity
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    /// Unique login name
    pub user_name: UserName,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: UserPassword,
    pub user_role: UserRole,
    pub user_status: UserStatus,
    /// Last successful login time
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user
    pub fn new(
        user_name: UserName,
        email: Email,
        password: UserPassword,
        user_role: UserRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: UserId::new(),
            user_name,
            email,
            first_name: None,
            last_name: None,
            password,
            user_role,
            user_status: UserStatus::Active,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_names(mut self, first_name: Option<String>, last_name: Option<String>) -> Self {
        self.first_name = first_name;
        self.last_name = last_name;
        self
    }

    /// Only active users may authenticate
    pub fn can_login(&self) -> bool {
        self.user_status.can_login()
    }

    pub fn is_admin(&self) -> bool {
        self.user_role.is_admin()
    }

    /// "First Last", or whichever half is present
    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(name), None) | (None, Some(name)) => Some(name.clone()),
            (None, None) => None,
        }
    }

    /// Replace the stored hash; the new password was policy-checked on input
    pub fn change_password(&mut self, password: UserPassword, now: DateTime<Utc>) {
        self.password = password;
        self.updated_at = now;
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Returns false when the current status cannot be re-activated
    pub fn activate(&mut self, now: DateTime<Utc>) -> bool {
        if !self.user_status.can_activate() {
            return self.user_status == UserStatus::Active;
        }
        self.user_status = UserStatus::Active;
        self.updated_at = now;
        true
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        if self.user_status == UserStatus::Active {
            self.user_status = UserStatus::Inactive;
            self.updated_at = now;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_user_is_active() {
        let now = Utc::now();
        let user = fixtures::user(now);
        assert!(user.can_login());
        assert!(!user.is_admin());
        assert_eq!(user.created_at, now);
    }

    #[test]
    fn test_status_transitions() {
        let now = Utc::now();
        let mut user = fixtures::user(now);

        user.deactivate(now + Duration::minutes(1));
        assert_eq!(user.user_status, UserStatus::Inactive);
        assert!(!user.can_login());
        assert_eq!(user.updated_at, now + Duration::minutes(1));

        assert!(user.activate(now + Duration::minutes(2)));
        assert!(user.can_login());

        user.user_status = UserStatus::Deleted;
        assert!(!user.activate(now + Duration::minutes(3)));
        assert_eq!(user.user_status, UserStatus::Deleted);
    }

    #[test]
    fn test_full_name() {
        let user = fixtures::user(Utc::now());
        assert_eq!(user.full_name(), None);
        let user = user.with_names(Some("Alice".into()), Some("Liddell".into()));
        assert_eq!(user.full_name().as_deref(), Some("Alice Liddell"));
    }

    #[test]
    fn test_change_password_bumps_updated_at() {
        let now = Utc::now();
        let mut user = fixtures::user(now);
        let later = now + Duration::hours(1);
        user.change_password(UserPassword::from_phc_string(fixtures::DUMMY_PHC).unwrap(), later);
        assert_eq!(user.updated_at, later);
    }
}
