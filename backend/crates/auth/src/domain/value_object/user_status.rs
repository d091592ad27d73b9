//! User Status Value Object
//!
//! Users are never deleted by this crate; `Deleted` is a status like any other.
//! Only `Active` accounts may authenticate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// User account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i16)]
pub enum UserStatus {
    /// Normal active account
    #[default]
    Active = 0,

    /// Deactivated by the user or an operator
    Inactive = 1,

    /// Registered but not yet activated
    Pending = 2,

    /// Soft-deleted; kept for audit
    Deleted = 3,
}

impl UserStatus {
    /// Stored in `users.user_status`
    #[inline]
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    /// Lowercase name used in logs and profiles
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Pending => "pending",
            Self::Deleted => "deleted",
        }
    }

    #[inline]
    pub const fn can_login(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the account can move back to `Active`
    #[inline]
    pub const fn can_activate(&self) -> bool {
        matches!(self, Self::Inactive | Self::Pending)
    }

    #[inline]
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(Self::Active),
            1 => Some(Self::Inactive),
            2 => Some(Self::Pending),
            3 => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_can_login() {
        assert!(UserStatus::Active.can_login());
        assert!(!UserStatus::Inactive.can_login());
        assert!(!UserStatus::Pending.can_login());
        assert!(!UserStatus::Deleted.can_login());
    }

    #[test]
    fn test_id_and_code_mapping() {
        for status in [
            UserStatus::Active,
            UserStatus::Inactive,
            UserStatus::Pending,
            UserStatus::Deleted,
        ] {
            assert_eq!(UserStatus::from_id(status.id()), Some(status));
            assert_eq!(status.to_string(), status.code());
        }
        assert_eq!(UserStatus::from_id(42), None);
    }

    #[test]
    fn test_activation_rules() {
        assert!(UserStatus::Pending.can_activate());
        assert!(UserStatus::Inactive.can_activate());
        assert!(!UserStatus::Deleted.can_activate());
    }
}
