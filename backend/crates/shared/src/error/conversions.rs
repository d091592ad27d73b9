//! Error conversions - From implementations for common error types
//!
//! Provides automatic conversion from common error types to [`AppError`],
//! plus the SQLSTATE classifier used by transaction retry policies.

use super::app_error::AppError;
use super::kind::ErrorKind;

/// SQLSTATE codes that indicate a transaction may succeed if re-run.
///
/// * `40001` - serialization_failure
/// * `40P01` - deadlock_detected
pub const RETRYABLE_SQLSTATES: &[&str] = &["40001", "40P01"];

/// Message fragments drivers emit for the same conditions when no
/// SQLSTATE is attached.
const RETRYABLE_MESSAGE_PATTERNS: &[&str] = &[
    "deadlock",
    "serialization failure",
    "could not serialize access",
    "retry transaction",
];

/// Whether a SQLSTATE marks a retryable conflict
#[inline]
pub fn is_retryable_sqlstate(code: &str) -> bool {
    RETRYABLE_SQLSTATES.contains(&code)
}

/// Whether an error message looks like a retryable conflict
pub fn is_retryable_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    RETRYABLE_MESSAGE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

// ============================================================================
// Standard library conversions
// ============================================================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::Forbidden,
            std::io::ErrorKind::TimedOut => ErrorKind::RequestTimeout,
            _ => ErrorKind::InternalServerError,
        };
        AppError::new(kind, "I/O operation failed").with_source(err)
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(err: std::num::ParseIntError) -> Self {
        AppError::bad_request("Invalid integer format").with_source(err)
    }
}

// ============================================================================
// SQLx conversions (feature-gated)
// ============================================================================

/// Whether a sqlx error is a serialization failure or deadlock
#[cfg(feature = "sqlx")]
pub fn is_retryable_sqlx(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => is_retryable_sqlstate(code.as_ref()),
            None => is_retryable_message(db_err.message()),
        },
        _ => false,
    }
}

/// Classify a sqlx error without consuming it
#[cfg(feature = "sqlx")]
pub fn classify_sqlx(err: &sqlx::Error) -> AppError {
    let classified = match err {
        sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
        sqlx::Error::PoolTimedOut => {
            AppError::service_unavailable("Database connection pool exhausted")
        }
        sqlx::Error::Database(db_err) => {
            // PostgreSQL specific error codes
            // https://www.postgresql.org/docs/current/errcodes-appendix.html
            match db_err.code().as_deref() {
                // Class 40: Transaction Rollback
                Some(code) if is_retryable_sqlstate(code) => {
                    AppError::service_unavailable("Transaction conflict")
                        .with_code("TRANSACTION_CONFLICT")
                }
                // Class 23: Integrity Constraint Violation
                Some("23505") => AppError::conflict("Duplicate key value"),
                Some("23503") => AppError::conflict("Foreign key violation"),
                Some("23502") => AppError::bad_request("Required field is null"),
                Some("23514") => AppError::bad_request("Check constraint violation"),
                // Class 53: Insufficient Resources
                Some("53000" | "53100" | "53200" | "53300") => {
                    AppError::service_unavailable("Database resource exhausted")
                }
                // Class 57: Operator Intervention
                Some("57000" | "57014" | "57P01" | "57P02" | "57P03") => {
                    AppError::service_unavailable("Database unavailable")
                }
                _ => AppError::internal("Database error"),
            }
        }
        sqlx::Error::Io(_) => AppError::service_unavailable("Database connection error"),
        _ => AppError::internal("Database error"),
    };

    if classified.code() == classified.kind().default_code() {
        classified.with_code("DATABASE_ERROR")
    } else {
        classified
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        classify_sqlx(&err).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert_eq!(app_err.kind(), ErrorKind::NotFound);

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let app_err: AppError = io_err.into();
        assert_eq!(app_err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn test_parse_int_error_conversion() {
        let parse_err: Result<i32, _> = "abc".parse();
        let app_err: AppError = parse_err.unwrap_err().into();
        assert_eq!(app_err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_retryable_sqlstates() {
        assert!(is_retryable_sqlstate("40001"));
        assert!(is_retryable_sqlstate("40P01"));
        assert!(!is_retryable_sqlstate("23505"));
    }

    #[test]
    fn test_retryable_messages() {
        assert!(is_retryable_message("ERROR: deadlock detected"));
        assert!(is_retryable_message(
            "could not serialize access due to concurrent update"
        ));
        assert!(!is_retryable_message("duplicate key value violates unique constraint"));
    }

    #[cfg(feature = "sqlx")]
    #[test]
    fn test_sqlx_row_not_found() {
        let app_err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(app_err.kind(), ErrorKind::NotFound);
        assert_eq!(app_err.code(), "DATABASE_ERROR");
        assert!(!is_retryable_sqlx(&sqlx::Error::RowNotFound));
    }
}
