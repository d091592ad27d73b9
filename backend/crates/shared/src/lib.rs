//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the "smallest core" of domain vocabulary:
//! - Common error types, the error taxonomy and result aliases
//! - Typed identifiers for users, sessions and login attempts
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod category;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
