//! Credential Validator

use std::sync::Arc;

use crate::domain::entity::user::User;
use crate::domain::repository::{PasswordHasher, UserRepository};
use crate::domain::value_object::{user_name::UserName, user_password::RawPassword};
use crate::error::AuthResult;

/// Checks a user name / password pair against the user store
#[derive(Clone)]
pub struct CredentialValidator {
    hasher: Arc<dyn PasswordHasher>,
}

impl CredentialValidator {
    pub fn new(hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { hasher }
    }

    /// `Some(user)` when the password matches, whatever the account status
    ///
    /// An unknown user and a wrong password both yield `None`.
    pub async fn validate<S>(
        &self,
        store: &S,
        user_name: &UserName,
        password: &RawPassword,
    ) -> AuthResult<Option<User>>
    where
        S: UserRepository + Sync,
    {
        let Some(user) = store.find_user_by_name(user_name).await? else {
            tracing::debug!(user_name = %user_name, "Unknown user name");
            return Ok(None);
        };

        if self.hasher.verify(password, &user.password) {
            Ok(Some(user))
        } else {
            tracing::debug!(user_id = %user.user_id, "Password mismatch");
            Ok(None)
        }
    }

    pub fn hasher(&self) -> &Arc<dyn PasswordHasher> {
        &self.hasher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn test_validate_outcomes() {
        let (store, hasher) = test_support::store_with_hasher();
        let user = test_support::seed_user(&store, &*hasher, "alice", "CorrectHorse9!").await;
        let validator = CredentialValidator::new(hasher);
        let name = UserName::new("alice").unwrap();

        let found = validator
            .validate(&store, &name, &RawPassword::candidate("CorrectHorse9!".into()).unwrap())
            .await
            .unwrap();
        assert_eq!(found.map(|u| u.user_id), Some(user.user_id));

        let wrong = validator
            .validate(&store, &name, &RawPassword::candidate("nope-nope".into()).unwrap())
            .await
            .unwrap();
        assert!(wrong.is_none());

        let unknown = validator
            .validate(
                &store,
                &UserName::new("mallory").unwrap(),
                &RawPassword::candidate("CorrectHorse9!".into()).unwrap(),
            )
            .await
            .unwrap();
        assert!(unknown.is_none());
    }
}
