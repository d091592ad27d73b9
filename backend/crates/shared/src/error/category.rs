//! Error Category - The four-way error taxonomy
//!
//! Clients write retry/backoff policy against the category, never against
//! free-text messages.

use serde::Serialize;

use super::kind::ErrorKind;

/// エラー分類
///
/// * `Validation` - 値オブジェクトの構築失敗（トランザクションに入らない）
/// * `Auth` - 認証情報・トークン・セッションの不一致
/// * `Business` - 業務ルール違反（ロック、ユーザー不在、リフレッシュ期限切れ）
/// * `System` - ストレージ障害、署名失敗など
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Validation,
    Auth,
    Business,
    System,
}

impl ErrorCategory {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Business => "business",
            ErrorCategory::System => "system",
        }
    }

    /// Category implied by a bare [`ErrorKind`]
    pub const fn for_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::BadRequest => ErrorCategory::Validation,
            ErrorKind::Unauthorized | ErrorKind::Forbidden => ErrorCategory::Auth,
            ErrorKind::NotFound | ErrorKind::Conflict | ErrorKind::TooManyRequests => {
                ErrorCategory::Business
            }
            ErrorKind::RequestTimeout
            | ErrorKind::InternalServerError
            | ErrorKind::ServiceUnavailable => ErrorCategory::System,
        }
    }

    /// カテゴリに対応する既定の [`ErrorKind`]
    ///
    /// validation→400, auth→401, business→409, system→500
    #[inline]
    pub const fn default_kind(&self) -> ErrorKind {
        match self {
            ErrorCategory::Validation => ErrorKind::BadRequest,
            ErrorCategory::Auth => ErrorKind::Unauthorized,
            ErrorCategory::Business => ErrorKind::Conflict,
            ErrorCategory::System => ErrorKind::InternalServerError,
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kinds() {
        assert_eq!(ErrorCategory::Validation.default_kind().status_code(), 400);
        assert_eq!(ErrorCategory::Auth.default_kind().status_code(), 401);
        assert_eq!(ErrorCategory::Business.default_kind().status_code(), 409);
        assert_eq!(ErrorCategory::System.default_kind().status_code(), 500);
    }

    #[test]
    fn test_kind_round_trips_to_category() {
        for category in [
            ErrorCategory::Validation,
            ErrorCategory::Auth,
            ErrorCategory::Business,
            ErrorCategory::System,
        ] {
            assert_eq!(ErrorCategory::for_kind(category.default_kind()), category);
        }
        assert_eq!(ErrorCategory::for_kind(ErrorKind::RequestTimeout), ErrorCategory::System);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCategory::Business.to_string(), "business");
    }
}
