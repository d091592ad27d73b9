//! Domain Layer
//!
//! Contains entities, value objects, and store traits.

pub mod entity;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    login_attempt::{FailureReason, LoginAttempt},
    session::{NewSession, Session, SessionState, SessionSummary},
    token_claims::TokenClaims,
    user::User,
};
pub use repository::{
    AuthStores, LoginAttemptRepository, Page, PageRequest, PasswordHasher, SessionRepository,
    UserRepository,
};
