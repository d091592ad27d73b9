//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, store traits
//! - `application/` - Session lifecycle, tokens, throttling, transactions, use cases
//! - `infra/` - PostgreSQL and in-memory stores, Argon2id hasher
//!
//! ## Features
//! - Login with user name + password, remember-me refresh lifetime
//! - RS256 access/refresh token pairs; full rotation on every refresh
//! - Per-device sessions with listing and revocation
//! - Sliding-window lockout per (user name, IP)
//!
//! ## Consistency Model
//! - Multi-step writes go through the transaction coordinator
//! - Login's session row and success record commit or roll back together
//! - Password change and revocation of other sessions are atomic
//! - Refresh retries on serialization failure; concurrent reuse of one
//!   refresh token lets exactly one caller through

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

#[cfg(test)]
pub(crate) mod test_support;


// Re-exports for convenience
pub use application::config::AuthConfig;
pub use application::service::AuthService;
pub use error::{AuthError, AuthResult};
pub use infra::{memory::MemoryAuthStore, postgres::PgAuthRepository};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
}

pub mod store {
    pub use crate::infra::postgres::PgAuthRepository as AuthStore;
}
