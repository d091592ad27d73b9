//! Shared fixtures for unit and flow tests

use std::sync::Arc;

use chrono::Utc;
use platform::clock::Clock;
use platform::password::HashingParams;

use crate::application::config::AuthConfig;
use crate::application::service::AuthService;
use crate::application::token_issuer::TokenIssuer;
use crate::domain::entity::user::User;
use crate::domain::repository::{PasswordHasher, UserRepository};
use crate::domain::value_object::{
    email::Email, user_name::UserName, user_password::RawPassword, user_role::UserRole,
};
use crate::infra::memory::MemoryAuthStore;
use crate::infra::password_hasher::Argon2PasswordHasher;

pub const PRIVATE_PEM: &str = include_str!("../testdata/jwt_private.pem");
pub const PUBLIC_PEM: &str = include_str!("../testdata/jwt_public.pem");
/// Valid RSA key that does not match [`PUBLIC_PEM`]
pub const OTHER_PRIVATE_PEM: &str = include_str!("../testdata/other_private.pem");

pub fn config() -> AuthConfig {
    AuthConfig::development(PRIVATE_PEM, PUBLIC_PEM)
}

pub fn issuer() -> TokenIssuer {
    TokenIssuer::new(&config()).unwrap()
}

pub fn hasher() -> Arc<dyn PasswordHasher> {
    let params = HashingParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    Arc::new(Argon2PasswordHasher::new(params, None).unwrap())
}

pub fn store_with_hasher() -> (MemoryAuthStore, Arc<dyn PasswordHasher>) {
    (MemoryAuthStore::new(), hasher())
}

/// Insert an active user with the given credentials
pub async fn seed_user(
    store: &MemoryAuthStore,
    hasher: &dyn PasswordHasher,
    name: &str,
    password: &str,
) -> User {
    let raw = RawPassword::candidate(password.to_string()).unwrap();
    let user = User::new(
        UserName::new(name).unwrap(),
        Email::new(format!("{name}@example.com")).unwrap(),
        hasher.hash(&raw).unwrap(),
        UserRole::User,
        Utc::now(),
    );
    store.create_user(&user).await.unwrap();
    user
}

pub fn service(store: &MemoryAuthStore, clock: Arc<dyn Clock>) -> AuthService<MemoryAuthStore> {
    AuthService::new(Arc::new(store.clone()), config(), hasher(), clock).unwrap()
}
