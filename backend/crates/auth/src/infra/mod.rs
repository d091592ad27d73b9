//! Infrastructure Layer
//!
//! Store implementations and the password hasher.

pub mod memory;
pub mod password_hasher;
pub mod postgres;

pub use memory::MemoryAuthStore;
pub use password_hasher::Argon2PasswordHasher;
pub use postgres::{PgAuthRepository, PgTransaction};
