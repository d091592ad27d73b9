//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Opaque tokens, digests and constant-time comparison
//! - Password policy and hashing (Argon2id, NIST SP 800-63B compliant)
//! - Client device fingerprinting
//! - Sliding-window rate limit policy
//! - Injectable clock

pub mod client;
pub mod clock;
pub mod crypto;
pub mod password;
pub mod rate_limit;
