//! User Role Value Object
//!
//! Carried in every token so callers can authorize without a user lookup.

use derive_more::Display;
use kernel::error::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum UserRole {
    #[default]
    #[display("user")]
    User = 0,
    #[display("admin")]
    Admin = 1,
    /// Read-only accounts
    #[display("guest")]
    Guest = 2,
}

impl UserRole {
    /// Stored in `users.user_role`
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Decode the stored column; an unknown value means a corrupt row
    pub fn from_id(id: i16) -> AppResult<Self> {
        [UserRole::User, UserRole::Admin, UserRole::Guest]
            .into_iter()
            .find(|role| role.id() == id)
            .ok_or_else(|| {
                tracing::error!(id, "Invalid UserRole id");
                AppError::internal(format!("Invalid user role id: {id}"))
            })
    }
}
